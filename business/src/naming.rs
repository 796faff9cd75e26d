//! Generated filenames.

use chrono::{SecondsFormat, Utc};
use pasteup_services::Hasher;
use rand::Rng as _;
use rand::distributions::Alphanumeric;

use crate::config::NamingMethod;
use crate::interaction::Interaction;

/// Name browsers and screenshot tools give to anonymous pasted images.
pub const PLACEHOLDER_NAME: &str = "image";

/// Length of `nanoid` names.
pub const NANOID_LENGTH: usize = 10;

/// Length of `contentHashShort` names.
pub const SHORT_HASH_LENGTH: usize = 8;

/// Produce a name for `data`. `None` when the user cancels a prompt.
pub async fn generate_name(
    method: NamingMethod,
    data: &[u8],
    current: Option<&str>,
    hasher: &Hasher,
    interaction: &dyn Interaction,
) -> Option<String> {
    let name = match method {
        NamingMethod::ContentHash => hasher.hash(data).await,
        NamingMethod::ContentHashShort => {
            let mut digest = hasher.hash(data).await;
            digest.truncate(SHORT_HASH_LENGTH);
            digest
        }
        NamingMethod::Uuid => uuid::Uuid::new_v4().to_string(),
        NamingMethod::Nanoid => nanoid(),
        NamingMethod::Timestamp => Utc::now().timestamp_millis().to_string(),
        NamingMethod::IsoDate => iso_date_name(),
        NamingMethod::Prompt => {
            let placeholder = current.filter(|n| !n.is_empty()).unwrap_or(PLACEHOLDER_NAME);
            interaction.input_filename(placeholder)?.trim().to_owned()
        }
    };
    (!name.is_empty()).then_some(name)
}

fn nanoid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NANOID_LENGTH)
        .map(char::from)
        .collect()
}

/// ISO-8601 timestamp usable as a filename, e.g. `2024-03-15T09-30-00-123Z`.
fn iso_date_name() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}
