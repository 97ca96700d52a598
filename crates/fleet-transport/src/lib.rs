mod config;
mod messages;
mod mqtt;
mod server;
mod websocket;

pub use config::{load_and_validate, AppConfigError, AppConfigPaths, LoadedConfig};
pub use messages::{InboundMessage, OutboundMessage};
pub use mqtt::{run_mqtt_bridge, MqttConfig};
pub use server::{run_server, ServerConfig};
