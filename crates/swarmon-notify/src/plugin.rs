use crate::error::NotifyError;
use crate::NotificationChannel;
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// Builds one kind of [`NotificationChannel`] from the `config` table of a
/// channel entry in the server configuration.
pub trait ChannelPlugin: Send + Sync {
    /// Value of `channel_type` this plugin answers to.
    fn name(&self) -> &str;

    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Checks that a recipient is addressable by this channel type.
    fn validate_recipient(&self, recipient: &str) -> Result<()>;

    /// Called only with a config that passed [`Self::validate_config`].
    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>>;

    /// Copy of `config` safe to log.
    fn redact_config(&self, config: &Value) -> Value {
        config.clone()
    }
}

/// Channel plugins keyed by `channel_type`.
///
/// # Examples
///
/// ```
/// use swarmon_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// assert_eq!(registry.plugin_names(), vec!["email", "webhook"]);
/// assert!(!registry.has_plugin("sms"));
/// ```
pub struct ChannelRegistry {
    plugins: BTreeMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    /// An empty registry; [`Default`] has the built-in plugins.
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Checks a channel definition without building any transport.
    pub fn validate(&self, channel_type: &str, config: &Value, recipients: &[String]) -> Result<()> {
        let plugin = self.require(channel_type)?;
        plugin.validate_config(config)?;
        recipients
            .iter()
            .try_for_each(|recipient| plugin.validate_recipient(recipient))
    }

    /// Validates the definition, then builds the channel.
    pub fn build(
        &self,
        channel_type: &str,
        config: &Value,
        recipients: &[String],
    ) -> Result<Box<dyn NotificationChannel>> {
        self.validate(channel_type, config, recipients)?;
        self.require(channel_type)?.create_channel(config)
    }

    pub fn get_plugin(&self, channel_type: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(channel_type).map(|p| p.as_ref())
    }

    pub fn has_plugin(&self, channel_type: &str) -> bool {
        self.plugins.contains_key(channel_type)
    }

    /// Registered channel types in sorted order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    fn require(&self, channel_type: &str) -> Result<&dyn ChannelPlugin> {
        self.get_plugin(channel_type)
            .ok_or_else(|| NotifyError::UnknownChannelType(channel_type.to_string()).into())
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::email::EmailPlugin));
        registry.register(Box::new(crate::channels::webhook::WebhookPlugin));
        registry
    }
}
