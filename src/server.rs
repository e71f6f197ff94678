//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use serde::Deserialize;

use crate::serializer::{SavePayload, SavedMap};
use crate::AllocatorError;

const SAVE_PATH: &str = "save_map";
const LOAD_PATH: &str = "load_map";

/// Where and as what a map is stored on the registration server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    pub base_url: String,
    pub gallery: String,
    pub surface_type: String,
    pub csrf_token: String,
}

/// Reply of the save endpoint
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl SaveResponse {
    /// The server's message, as an error when it refused the save
    pub fn into_result(self) -> Result<String, AllocatorError> {
        if self.success {
            Ok(self.message)
        } else {
            Err(AllocatorError::Server(self.message))
        }
    }
}

impl Endpoint {
    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn save_url(&self) -> String {
        self.url_for(SAVE_PATH)
    }

    pub fn load_url(&self) -> String {
        self.url_for(LOAD_PATH)
    }

    /// Form fields posted to the save endpoint
    pub fn save_form(&self, payload: &SavePayload) -> [(&'static str, String); 5] {
        [
            ("gallery", self.gallery.clone()),
            ("surface_type", self.surface_type.clone()),
            ("csrf_token", self.csrf_token.clone()),
            ("panels", payload.panels.clone()),
            ("assignments", payload.assignments.clone()),
        ]
    }

    pub fn load_query(&self) -> [(&'static str, String); 2] {
        [
            ("gallery", self.gallery.clone()),
            ("surface_type", self.surface_type.clone()),
        ]
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod transport {
    use super::*;
    use reqwest::blocking::Client;

    /// Posts the map. Blocks, so it must run off the UI thread.
    pub fn save_map(endpoint: &Endpoint, payload: &SavePayload) -> Result<String, AllocatorError> {
        let response: SaveResponse = Client::new()
            .post(endpoint.save_url())
            .form(&endpoint.save_form(payload))
            .send()?
            .error_for_status()?
            .json()?;
        response.into_result()
    }

    pub fn load_map(endpoint: &Endpoint) -> Result<SavedMap, AllocatorError> {
        let bytes = Client::new()
            .get(endpoint.load_url())
            .query(&endpoint.load_query())
            .send()?
            .error_for_status()?
            .bytes()?;
        SavedMap::from_bytes(&bytes)
    }
}

#[cfg(target_arch = "wasm32")]
mod transport {
    use super::*;
    use reqwest::Client;

    pub async fn save_map(endpoint: &Endpoint, payload: &SavePayload) -> Result<String, AllocatorError> {
        let response: SaveResponse = Client::new()
            .post(endpoint.save_url())
            .form(&endpoint.save_form(payload))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_result()
    }

    pub async fn load_map(endpoint: &Endpoint) -> Result<SavedMap, AllocatorError> {
        let bytes = Client::new()
            .get(endpoint.load_url())
            .query(&endpoint.load_query())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        SavedMap::from_bytes(&bytes)
    }
}

pub use transport::{load_map, save_map};

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            base_url: "https://example.org/art_show_admin/".to_string(),
            gallery: "General".to_string(),
            surface_type: "panel".to_string(),
            csrf_token: "t0ken".to_string(),
        }
    }

    #[test]
    fn urls_join_without_double_slashes() {
        assert_eq!(
            endpoint().save_url(),
            "https://example.org/art_show_admin/save_map"
        );
        assert_eq!(
            endpoint().load_url(),
            "https://example.org/art_show_admin/load_map"
        );
    }

    #[test]
    fn save_form_carries_every_field() {
        let payload = SavePayload {
            panels: "{}".to_string(),
            assignments: "{\"1\":{}}".to_string(),
        };
        let form = endpoint().save_form(&payload);
        let names: Vec<&str> = form.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["gallery", "surface_type", "csrf_token", "panels", "assignments"]
        );
        assert_eq!(form[4].1, payload.assignments);
    }

    #[test]
    fn refused_save_surfaces_the_server_message() {
        let refused: SaveResponse =
            serde_json::from_str(r#"{"success": false, "message": "Gallery is locked"}"#).unwrap();
        match refused.into_result() {
            Err(AllocatorError::Server(message)) => assert_eq!(message, "Gallery is locked"),
            other => panic!("unexpected {:?}", other),
        }

        let accepted: SaveResponse =
            serde_json::from_str(r#"{"success": true, "message": "Map saved"}"#).unwrap();
        assert_eq!(accepted.into_result().unwrap(), "Map saved");
    }
}
