//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::grid::{FaceKey, PanelKey, Side, Usability};
use crate::layout_file::LayoutFile;
use crate::panel_logic::ArtistAssignment;
use crate::show_map::{Panel, ShowMap};
use crate::AllocatorError;

/// Separates the fields of one text-block record
pub const FIELD_SEPARATOR: char = '•';
const WIDE_PREFIX: &str = "wide|";

/// Stored form of one artist, keyed by artist id in the assignment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub name: String,
    pub needed: usize,
    #[serde(default)]
    pub panels: Vec<String>,
    #[serde(default)]
    pub manual: Vec<String>,
    #[serde(default, with = "wide_flag")]
    pub wide: Option<usize>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_info: String,
}

/// `false` when there is no minimum, otherwise the minimum run length
mod wide_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(wide: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match wide {
            Some(width) => serializer.serialize_u64(*width as u64),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Width(usize),
            Text(String),
            Off(bool),
        }
        Ok(match Option::<Flag>::deserialize(deserializer)? {
            Some(Flag::Width(width)) => Some(width),
            Some(Flag::Text(text)) => text.trim().parse().ok(),
            Some(Flag::Off(_)) | None => None,
        }
        .filter(|width| *width > 0))
    }
}

fn parse_faces(keys: &[String], artist_id: &str) -> BTreeSet<FaceKey> {
    keys.iter()
        .filter_map(|key| match key.parse() {
            Ok(face) => Some(face),
            Err(_) => {
                log::warn!("Dropping malformed face {} of artist {}", key, artist_id);
                None
            }
        })
        .collect()
}

impl ArtistRecord {
    pub fn from_artist(artist: &ArtistAssignment) -> Self {
        ArtistRecord {
            name: artist.name.clone(),
            needed: artist.needed,
            panels: artist.panels.iter().map(ToString::to_string).collect(),
            manual: artist.manual.iter().map(ToString::to_string).collect(),
            wide: artist.wide,
            extra_info: artist.extra_info.clone(),
        }
    }

    pub fn into_artist(self, id: String) -> ArtistAssignment {
        let manual = parse_faces(&self.manual, &id);
        let mut panels = parse_faces(&self.panels, &id);
        panels.extend(manual.iter().copied());
        ArtistAssignment {
            name: self.name,
            needed: self.needed,
            panels,
            manual,
            wide: self.wide,
            extra_info: self.extra_info,
            id,
        }
    }
}

/// Artists keyed by id, kept in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentTable(pub Vec<ArtistAssignment>);

impl Serialize for AssignmentTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for artist in &self.0 {
            map.serialize_entry(&artist.id, &ArtistRecord::from_artist(artist))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AssignmentTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = AssignmentTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of artist id to artist record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut artists = Vec::new();
                while let Some((id, record)) = access.next_entry::<String, ArtistRecord>()? {
                    artists.push(record.into_artist(id));
                }
                Ok(AssignmentTable(artists))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// A part of the server payload that may arrive either as an object or as the
/// JSON-encoded string it was saved as
fn embedded_json<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    struct EmbeddedVisitor<T>(PhantomData<T>);

    impl<'de, T: DeserializeOwned + Default> Visitor<'de> for EmbeddedVisitor<T> {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object or a JSON-encoded object")
        }

        fn visit_str<E: serde::de::Error>(self, text: &str) -> Result<T, E> {
            if text.trim().is_empty() {
                return Ok(T::default());
            }
            serde_json::from_str(text).map_err(E::custom)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<T, E> {
            Ok(T::default())
        }

        fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<T, A::Error> {
            T::deserialize(serde::de::value::MapAccessDeserializer::new(access))
        }
    }

    deserializer.deserialize_any(EmbeddedVisitor(PhantomData))
}

/// A saved map as returned by the load endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedMap {
    #[serde(default, deserialize_with = "embedded_json")]
    pub panels: LayoutFile,
    #[serde(default, deserialize_with = "embedded_json")]
    pub assignments: AssignmentTable,
}

impl SavedMap {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AllocatorError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Form fields for the save endpoint; both parts are JSON strings
#[derive(Debug, Clone, PartialEq)]
pub struct SavePayload {
    pub panels: String,
    pub assignments: String,
}

pub fn save_payload(map: &ShowMap, artists: &[ArtistAssignment]) -> Result<SavePayload, AllocatorError> {
    Ok(SavePayload {
        panels: serde_json::to_string(&LayoutFile::from_map(map))?,
        assignments: serde_json::to_string(&AssignmentTable(artists.to_vec()))?,
    })
}

/// Meaningful lines of a text block: trimmed, without blanks and `#` comments
fn records(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// One line per artist: `id•name•needed[•face…][•wide|N]`.
/// The extended form also lists every face the artist holds.
pub fn artists_to_text(artists: &[ArtistAssignment], extended: bool) -> String {
    artists
        .iter()
        .map(|artist| {
            let mut fields = vec![
                artist.id.clone(),
                artist.name.clone(),
                artist.needed.to_string(),
            ];
            if extended {
                fields.extend(artist.panels.iter().map(ToString::to_string));
            }
            if let Some(width) = artist.wide {
                fields.push(format!("{}{}", WIDE_PREFIX, width));
            }
            fields.join(&FIELD_SEPARATOR.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses an artist text block. Faces listed on a line become manual
/// assignments. Rows with an unreadable count are skipped.
pub fn artists_from_text(text: &str) -> Vec<ArtistAssignment> {
    records(text).filter_map(parse_artist_line).collect()
}

fn parse_artist_line(line: &str) -> Option<ArtistAssignment> {
    let mut fields = line.split(FIELD_SEPARATOR).map(str::trim);
    let id = fields.next().filter(|id| !id.is_empty())?;
    let name = fields.next().unwrap_or_default();
    let needed = match fields.next() {
        None => 1,
        Some(count) => match count.parse() {
            Ok(count) => count,
            Err(_) => {
                log::warn!("Skipping artist {}: unreadable count {:?}", id, count);
                return None;
            }
        },
    };
    let mut artist = ArtistAssignment::new(id, name, needed);
    for field in fields.filter(|field| !field.is_empty()) {
        if let Some(width) = field.strip_prefix(WIDE_PREFIX) {
            artist.wide = width.trim().parse().ok().filter(|width| *width > 0);
            continue;
        }
        match field.parse::<FaceKey>() {
            Ok(face) => {
                artist.panels.insert(face);
                artist.manual.insert(face);
            }
            Err(_) => log::warn!("Dropping malformed face {} of artist {}", field, id),
        }
    }
    Some(artist)
}

/// One line per panel: `panelKey•usability[•side=label…]`
pub fn layout_to_text(map: &ShowMap) -> String {
    map.panels()
        .iter()
        .map(|(key, panel)| {
            let mut fields = vec![key.to_string(), panel.usability.code(panel.orientation).to_string()];
            fields.extend(
                panel
                    .labels
                    .iter()
                    .map(|(side, label)| format!("{}={}", side.code(), label)),
            );
            fields.join(&FIELD_SEPARATOR.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a layout text block; malformed lines are skipped
pub fn layout_from_text(text: &str) -> Vec<(PanelKey, Panel)> {
    records(text)
        .filter_map(|line| {
            let parsed = parse_layout_line(line);
            if parsed.is_none() {
                log::warn!("Skipping malformed layout line {:?}", line);
            }
            parsed
        })
        .collect()
}

fn parse_layout_line(line: &str) -> Option<(PanelKey, Panel)> {
    let mut fields = line.split(FIELD_SEPARATOR).map(str::trim);
    let key: PanelKey = fields.next()?.parse().ok()?;
    let orientation = key.orientation();
    let usability = match fields.next() {
        Some(code) => Usability::from_code(code, orientation)?,
        None => Usability::Both,
    };
    let mut panel = Panel::new(orientation, usability);
    for field in fields {
        let (code, label) = field.split_once('=')?;
        let side = Side::from_code(code.trim()).filter(|side| side.orientation() == orientation)?;
        panel.labels.insert(side, label.trim().to_string());
    }
    Some((key, panel))
}

/// Artist roster from a CSV export: `name,needed[,wide]` after a header row.
/// Artists are numbered from 1 in row order.
pub fn roster_from_csv(data: &str) -> Vec<ArtistAssignment> {
    let mut artists = Vec::new();
    for row in data.lines().skip(1) {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            continue;
        }
        let Ok(needed) = fields[1].parse::<usize>() else {
            log::warn!("Skipping CSV row {:?}: unreadable count", row);
            continue;
        };
        let wide = fields
            .get(2)
            .filter(|width| !width.is_empty())
            .and_then(|width| width.parse().ok())
            .filter(|width| *width > 0);
        let id = (artists.len() + 1).to_string();
        artists.push(ArtistAssignment::new(id, fields[0], needed).with_wide(wide));
    }
    log::info!("Read {} artists from CSV", artists.len());
    artists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridPoint;

    fn face(s: &str) -> FaceKey {
        s.parse().unwrap()
    }

    #[test]
    fn artist_lines_skip_comments_and_default_the_count() {
        let text = "# roster\n\n7•Ann\n8•Bob•3•wide|2\n9•Cy•lots\n";
        let artists = artists_from_text(text);
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].id, "7");
        assert_eq!(artists[0].needed, 1);
        assert_eq!(artists[1].needed, 3);
        assert_eq!(artists[1].wide, Some(2));
    }

    #[test]
    fn listed_faces_become_manual() {
        let artists = artists_from_text("4•Dee•2•1_1|2_1|u•1_1|1_2|r");
        let artist = &artists[0];
        assert_eq!(artist.manual.len(), 2);
        assert_eq!(artist.panels, artist.manual);
        assert!(artist.manual.contains(&face("1_1|1_2|r")));
    }

    #[test]
    fn extended_text_round_trips_assignments() {
        let mut artist = ArtistAssignment::new("1", "Ann", 2).with_wide(Some(2));
        artist.panels.insert(face("1_1|2_1|u"));
        artist.panels.insert(face("2_1|3_1|u"));
        let text = artists_to_text(std::slice::from_ref(&artist), true);
        assert_eq!(text, "1•Ann•2•1_1|2_1|u•2_1|3_1|u•wide|2");

        let back = artists_from_text(&text);
        assert_eq!(back[0].panels, artist.panels);
        assert_eq!(back[0].wide, Some(2));
        assert_eq!(artists_to_text(&[artist], false), "1•Ann•2•wide|2");
    }

    #[test]
    fn csv_rows_are_numbered_and_bad_rows_skipped() {
        let csv = "name,panels,wide\nAnn,2,\nBob,x,1\nSolo\nCy,4,3\n";
        let artists = roster_from_csv(csv);
        assert_eq!(artists.len(), 2);
        assert_eq!((artists[0].id.as_str(), artists[0].wide), ("1", None));
        assert_eq!(artists[1].id, "2");
        assert_eq!(artists[1].name, "Cy");
        assert_eq!(artists[1].wide, Some(3));
    }

    #[test]
    fn layout_text_round_trips() {
        let mut map = ShowMap::new(4, 4);
        map.toggle_panel(GridPoint::new(1, 1), GridPoint::new(2, 1), Usability::SideA);
        map.toggle_panel(GridPoint::new(3, 1), GridPoint::new(3, 2), Usability::Both);
        map.set_face_label(&face("3_1|3_2|l"), "Wall 2");

        let text = layout_to_text(&map);
        let panels = layout_from_text(&text);
        assert_eq!(panels.len(), 2);
        let mut restored = ShowMap::new(4, 4);
        for (key, panel) in panels {
            restored.insert_panel(key, panel);
        }
        assert_eq!(restored.panels(), map.panels());
        assert!(layout_from_text("1_1|3_1•b\n1_1|2_1•q").is_empty());
    }

    #[test]
    fn assignment_table_keeps_document_order_and_wide_flag() {
        let json = r#"{
            "10": {"name": "Ten", "needed": 1, "panels": ["1_1|2_1|u"], "manual": [], "wide": false},
            "2": {"name": "Two", "needed": 3, "panels": [], "manual": ["1_1|2_1|d"], "wide": 2}
        }"#;
        let table: AssignmentTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.0[0].id, "10");
        assert_eq!(table.0[0].wide, None);
        assert_eq!(table.0[1].wide, Some(2));
        assert!(table.0[1].panels.contains(&face("1_1|2_1|d")));

        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["10"]["wide"], serde_json::json!(false));
        assert_eq!(value["2"]["manual"], serde_json::json!(["1_1|2_1|d"]));
    }

    #[test]
    fn saved_map_accepts_embedded_strings() {
        let payload = serde_json::json!({
            "panels": "{\"1_1|2_1\": {\"t\": \"h\", \"u\": \"b\"}}",
            "assignments": {"1": {"name": "Ann", "needed": 1}}
        });
        let saved = SavedMap::from_bytes(payload.to_string().as_bytes()).unwrap();
        assert_eq!(saved.panels.len(), 1);
        assert_eq!(saved.assignments.0[0].name, "Ann");

        let empty = SavedMap::from_bytes(b"{}").unwrap();
        assert!(empty.panels.is_empty());
    }
}
