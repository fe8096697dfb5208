// src/contracts/abi.rs
//! Human-readable ABIs of the deployed registries, token and faucet.
//!
//! Only the functions this crate calls are declared.

use ethers_core::abi::{parse_abi, Abi};
use once_cell::sync::Lazy;

pub static KEY_REGISTRY: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "struct Key { string id; uint8 keyType; bytes32[] keyUsages; bytes publicKey; bool sudo; }",
        "function didExists(address did) view returns (bool)",
        "function getKeys(address did) view returns (Key[])",
        "function registerDid(Key[] keys)",
        "function addKey(address did, Key key)",
        "function removeKey(address did, string keyId)",
    ])
    .expect("key registry ABI is well-formed")
});

pub static NAME_REGISTRY: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "function getDidForName(string name) view returns (address)",
        "function getNameForDid(address did) view returns (string)",
        "function registerName(address did, string name)",
        "function unregisterName(address did)",
    ])
    .expect("name registry ABI is well-formed")
});

pub static SERVICE_ACCOUNT_REGISTRY: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "struct ServiceAccount { string id; string[] types; string[] endpoints; }",
        "function getServiceAccounts(address did) view returns (ServiceAccount[])",
        "function registerServiceAccount(address did, ServiceAccount[] accounts)",
        "function removeServiceAccount(address did, string id)",
    ])
    .expect("service account registry ABI is well-formed")
});

pub static ACCOUNT_LINK_REGISTRY: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "struct LinkedAccount { string id; address account; string purpose; bytes signature; }",
        "function getDidByLinkedAccount(address account) view returns (address)",
        "function getLinkedAccounts(address did) view returns (LinkedAccount[])",
        "function registerLinkedAccount(address did, string id, address account, string purpose, bytes signature)",
        "function removeLinkedAccount(address did, string id)",
    ])
    .expect("account link registry ABI is well-formed")
});

pub static ERC20: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&[
        "function balanceOf(address owner) view returns (uint256)",
        "function allowance(address owner, address spender) view returns (uint256)",
        "function approve(address spender, uint256 amount) returns (bool)",
        "function transfer(address to, uint256 amount) returns (bool)",
    ])
    .expect("ERC-20 ABI is well-formed")
});

pub static FAUCET: Lazy<Abi> = Lazy::new(|| {
    parse_abi(&["function requestTokens()"]).expect("faucet ABI is well-formed")
});

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::abi::ParamType;

    #[test]
    fn struct_parameters_become_tuples() {
        let get_keys = KEY_REGISTRY.function("getKeys").unwrap();
        assert_eq!(
            get_keys.outputs[0].kind,
            ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::String,
                ParamType::Uint(8),
                ParamType::Array(Box::new(ParamType::FixedBytes(32))),
                ParamType::Bytes,
                ParamType::Bool,
            ])))
        );

        let register = SERVICE_ACCOUNT_REGISTRY.function("registerServiceAccount").unwrap();
        assert_eq!(register.inputs.len(), 2);
    }

    #[test]
    fn every_abi_parses() {
        for (abi, method) in [
            (&*KEY_REGISTRY, "didExists"),
            (&*NAME_REGISTRY, "getDidForName"),
            (&*SERVICE_ACCOUNT_REGISTRY, "removeServiceAccount"),
            (&*ACCOUNT_LINK_REGISTRY, "getDidByLinkedAccount"),
            (&*ERC20, "allowance"),
            (&*FAUCET, "requestTokens"),
        ] {
            assert!(abi.function(method).is_ok(), "{method}");
        }
    }
}
