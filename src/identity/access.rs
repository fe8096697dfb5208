// src/identity/access.rs
//! Write-access evaluation for the connected wallet.

use crate::identity::lookup::Lookup;
use crate::models::records::KeyRecord;
use ethers::types::Address;
use serde::Serialize;

/// True when `connected` holds an authentication key in `keys`.
///
/// The key's public key must equal the connected address (ignoring case) and its
/// usages must include `keccak256("auth")`.
pub fn has_write_access(keys: &[KeyRecord], connected: Option<Address>) -> bool {
    let Some(connected) = connected else {
        return false;
    };
    keys.iter().any(|key| key.belongs_to(connected) && key.is_auth())
}

/// A DID exists exactly when it has at least one key.
pub fn did_found(keys: &[KeyRecord]) -> bool {
    !keys.is_empty()
}

/// Flags derived from one key-set fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessState {
    pub found: bool,
    pub write_access: bool,
}

impl AccessState {
    /// Rebuilds both flags from scratch.
    ///
    /// Nothing carries over from a previous evaluation: an unknown key set or a missing
    /// wallet yields `false` for whichever flag depends on it.
    pub fn evaluate(keys: &Lookup<Vec<KeyRecord>>, connected: Option<Address>) -> Self {
        match keys.found() {
            Some(keys) => AccessState {
                found: did_found(keys),
                write_access: has_write_access(keys, connected),
            },
            None => AccessState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::KEY_USAGE_AUTH;
    use ethers::types::H256;

    const OWNER: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";

    fn owner() -> Address {
        OWNER.parse().unwrap()
    }

    fn key(public_key: &str, usages: Vec<H256>) -> KeyRecord {
        KeyRecord {
            id: "default".into(),
            key_type: 0,
            key_usages: usages,
            public_key: public_key.into(),
            sudo: false,
        }
    }

    #[test]
    fn empty_keys_or_no_wallet_deny_access() {
        assert!(!has_write_access(&[], Some(owner())));
        assert!(!has_write_access(&[key(OWNER, vec![*KEY_USAGE_AUTH])], None));
    }

    #[test]
    fn public_key_match_ignores_case() {
        let keys = [key(&OWNER.to_uppercase().replace("0X", "0x"), vec![*KEY_USAGE_AUTH])];
        assert!(has_write_access(&keys, Some(owner())));

        let keys = [key(&OWNER.to_lowercase(), vec![*KEY_USAGE_AUTH])];
        assert!(has_write_access(&keys, Some(owner())));
    }

    #[test]
    fn non_auth_key_grants_nothing() {
        let keys = [key(OWNER, vec![H256::repeat_byte(0xaa)])];
        assert!(!has_write_access(&keys, Some(owner())));
        assert!(did_found(&keys));
    }

    #[test]
    fn switching_account_drops_access_immediately() {
        let keys = Lookup::Found(vec![key(OWNER, vec![H256::repeat_byte(1), *KEY_USAGE_AUTH])]);

        let before = AccessState::evaluate(&keys, Some(owner()));
        assert_eq!(before, AccessState { found: true, write_access: true });

        let after = AccessState::evaluate(&keys, Some(Address::repeat_byte(0x42)));
        assert_eq!(after, AccessState { found: true, write_access: false });

        let disconnected = AccessState::evaluate(&keys, None);
        assert!(!disconnected.write_access);
    }

    #[test]
    fn unknown_key_set_clears_both_flags() {
        let failed: Lookup<Vec<KeyRecord>> = Lookup::Failed("rpc down".into());
        assert_eq!(AccessState::evaluate(&failed, Some(owner())), AccessState::default());

        let empty = Lookup::Found(vec![]);
        assert_eq!(AccessState::evaluate(&empty, Some(owner())), AccessState::default());
    }
}
