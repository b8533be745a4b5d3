mod crypto;
mod provider;

pub use provider::AadTokenProvider;
