//! Wallet descriptors shown to the selection surface.

use serde::{Deserialize, Serialize};

/// Display metadata for a registered wallet.
///
/// `installed` is derived from the browser environment and only the
/// installation detector recomputes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDescriptor {
    /// Stable key (e.g., "metamask").
    pub id: String,
    pub display_name: String,
    /// Icon URL.
    pub icon: String,
    pub description: Option<String>,
    /// Where to get the extension when it is missing.
    pub download_url: Option<String>,
    #[serde(skip_deserializing)]
    installed: bool,
}

impl WalletDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon: icon.into(),
            description: None,
            download_url: None,
            installed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    pub fn installed(&self) -> bool {
        self.installed
    }

    pub(crate) fn set_installed(&mut self, installed: bool) {
        self.installed = installed;
    }
}
