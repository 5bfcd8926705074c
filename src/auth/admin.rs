use std::collections::HashSet;

use super::CallerIdentity;

/// Set-membership check for administrator addresses
pub trait AdminRegistry: Send + Sync {
    fn is_admin(&self, caller: &CallerIdentity) -> bool;
}

/// Administrator set loaded once at process start.
///
/// Addresses are hex, so membership ignores case (checksummed and lowercase
/// forms of the same wallet match).
#[derive(Debug, Clone, Default)]
pub struct StaticAdminRegistry {
    addresses: HashSet<String>,
}

impl StaticAdminRegistry {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| a.as_ref().trim().to_ascii_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl AdminRegistry for StaticAdminRegistry {
    fn is_admin(&self, caller: &CallerIdentity) -> bool {
        self.addresses.contains(&caller.address().to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{extract_subject, sign_token, Claims};

    fn caller(address: &str) -> CallerIdentity {
        let token = sign_token(&Claims::new(address, chrono::Duration::hours(1)), "s").unwrap();
        extract_subject(&token).unwrap()
    }

    #[test]
    fn membership_ignores_case() {
        let registry = StaticAdminRegistry::new(["0xAbC", " ", "0xdef "]);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_admin(&caller("0xabc")));
        assert!(registry.is_admin(&caller("0xDEF")));
        assert!(!registry.is_admin(&caller("0x123")));
    }

    #[test]
    fn empty_registry_admits_nobody() {
        let registry = StaticAdminRegistry::default();
        assert!(registry.is_empty());
        assert!(!registry.is_admin(&caller("0xabc")));
    }
}
