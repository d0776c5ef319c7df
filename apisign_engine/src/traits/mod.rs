mod salt_ledger;
mod secret_resolver;

pub use salt_ledger::SaltLedger;
pub use secret_resolver::SecretResolver;
