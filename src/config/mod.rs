//! Configuration module for Lexa.
//!
//! Provider credentials, default models, and retry budgets, loaded once at
//! startup and handed to the clients.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, OpenAISettings, PalmSettings, RetrySettings, Settings,
};
