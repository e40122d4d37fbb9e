//! Backend clients: identity, configuration and activation.

pub mod client;
pub mod registry;
pub mod resolver;

pub use client::{Client, ClientContext, Registrar};
pub use registry::{
    ClientFactory, ClientRegistry, ClientRegistryEntry, ConfigKey, ConfigValues, HeaderExtractor,
};
pub use resolver::{env_var_name, ConfigResolver, EnvResolver, HeaderResolver};
