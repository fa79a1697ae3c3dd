use crate::access::CallerIdentity;

/// Decides which table a caller's requests land in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LedgerScope {
    /// One table per username.
    #[default]
    PerUser,
    /// Every caller shares the named table.
    Shared(String),
}

impl LedgerScope {
    pub fn owner_for<'a>(&'a self, caller: &'a CallerIdentity) -> &'a str {
        match self {
            LedgerScope::PerUser => &caller.username,
            LedgerScope::Shared(name) => name,
        }
    }
}
