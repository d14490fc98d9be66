use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub const EXPANSION_TYPE: &str = "boardgameexpansion";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThingType {
    #[value(name = "boardgame")]
    BoardGame,
    #[value(name = "boardgameexpansion")]
    BoardGameExpansion,
    #[value(name = "boardgameaccessory")]
    BoardGameAccessory,
    #[value(name = "rpgitem")]
    RpgItem,
    #[value(name = "videogame")]
    VideoGame,
}

impl ThingType {
    pub fn as_upstream(&self) -> &'static str {
        match self {
            ThingType::BoardGame => "boardgame",
            ThingType::BoardGameExpansion => EXPANSION_TYPE,
            ThingType::BoardGameAccessory => "boardgameaccessory",
            ThingType::RpgItem => "rpgitem",
            ThingType::VideoGame => "videogame",
        }
    }
}

impl fmt::Display for ThingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_upstream())
    }
}

impl FromStr for ThingType {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "boardgame" => Ok(ThingType::BoardGame),
            "boardgameexpansion" => Ok(ThingType::BoardGameExpansion),
            "boardgameaccessory" => Ok(ThingType::BoardGameAccessory),
            "rpgitem" => Ok(ThingType::RpgItem),
            "videogame" => Ok(ThingType::VideoGame),
            _ => Err(GatewayError::InvalidArgument(format!(
                "unknown thing type: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkKind {
    Category,
    Mechanic,
    Designer,
    Artist,
    Publisher,
    Family,
    BaseGame,
    Expansion,
    Accessory,
    Rpg,
    Other,
}

impl LinkKind {
    pub fn from_upstream(link_type: &str) -> LinkKind {
        match link_type {
            "boardgamecategory" => LinkKind::Category,
            "boardgamemechanic" => LinkKind::Mechanic,
            "boardgamedesigner" => LinkKind::Designer,
            "boardgameartist" => LinkKind::Artist,
            "boardgamepublisher" => LinkKind::Publisher,
            "boardgamefamily" => LinkKind::Family,
            "boardgamebase" => LinkKind::BaseGame,
            "boardgameexpansion" => LinkKind::Expansion,
            "boardgameaccessory" => LinkKind::Accessory,
            "rpgitem" | "rpgperiodical" => LinkKind::Rpg,
            _ => LinkKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub kind: LinkKind,
    pub link_type: String,
    pub id: String,
    pub value: String,
    pub inbound: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    pub id: String,
    pub name: String,
    pub alternate_names: Vec<String>,
    pub thing_type: Option<ThingType>,
    pub is_expansion: bool,
    pub rank: Option<u32>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub year_published: Option<i32>,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub playing_time: Option<u32>,
    pub min_play_time: Option<u32>,
    pub max_play_time: Option<u32>,
    pub min_age: Option<u32>,
    pub average: Option<f64>,
    pub bayes_average: Option<f64>,
    pub users_rated: Option<u32>,
    pub users_owned: Option<u32>,
    pub users_wanting: Option<u32>,
    pub users_wishing: Option<u32>,
    pub num_comments: Option<u32>,
    pub num_weights: Option<u32>,
    pub average_weight: Option<f64>,
    pub links: Vec<Link>,
}

impl Thing {
    pub fn links_of(&self, kind: LinkKind) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |link| link.kind == kind)
    }

    pub fn base_game_link(&self) -> Option<&Link> {
        if !self.is_expansion {
            return None;
        }
        self.links_of(LinkKind::BaseGame).next()
    }

    pub fn expansion_links(&self) -> Vec<&Link> {
        if self.is_expansion {
            return Vec::new();
        }
        self.links_of(LinkKind::Expansion).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAddress {
    pub state_or_province: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_link: Option<String>,
    pub year_registered: Option<i32>,
    pub last_login: Option<String>,
    pub support_years: u32,
    pub designer_id: Option<String>,
    pub publisher_id: Option<String>,
    pub address: Option<UserAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionSubtype {
    #[value(name = "boardgame")]
    BoardGame,
    #[value(name = "boardgameexpansion")]
    BoardGameExpansion,
    #[value(name = "boardgameaccessory")]
    BoardGameAccessory,
    #[value(name = "rpgitem")]
    RpgItem,
    #[value(name = "rpgissue")]
    RpgIssue,
    #[value(name = "videogame")]
    VideoGame,
}

impl CollectionSubtype {
    pub fn as_upstream(&self) -> &'static str {
        match self {
            CollectionSubtype::BoardGame => "boardgame",
            CollectionSubtype::BoardGameExpansion => EXPANSION_TYPE,
            CollectionSubtype::BoardGameAccessory => "boardgameaccessory",
            CollectionSubtype::RpgItem => "rpgitem",
            CollectionSubtype::RpgIssue => "rpgissue",
            CollectionSubtype::VideoGame => "videogame",
        }
    }
}

impl fmt::Display for CollectionSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_upstream())
    }
}

impl FromStr for CollectionSubtype {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "boardgame" => Ok(CollectionSubtype::BoardGame),
            "boardgameexpansion" => Ok(CollectionSubtype::BoardGameExpansion),
            "boardgameaccessory" => Ok(CollectionSubtype::BoardGameAccessory),
            "rpgitem" => Ok(CollectionSubtype::RpgItem),
            "rpgissue" => Ok(CollectionSubtype::RpgIssue),
            "videogame" => Ok(CollectionSubtype::VideoGame),
            _ => Err(GatewayError::InvalidArgument(format!(
                "unknown collection subtype: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatus {
    pub own: bool,
    pub prev_owned: bool,
    pub for_trade: bool,
    pub want: bool,
    pub want_to_play: bool,
    pub want_to_buy: bool,
    pub wishlist: bool,
    pub preordered: bool,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub min_play_time: Option<u32>,
    pub max_play_time: Option<u32>,
    pub playing_time: Option<u32>,
    pub num_owned: Option<u32>,
    pub user_rating: Option<f64>,
    pub average: Option<f64>,
    pub bayes_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub object_type: Option<String>,
    pub object_id: String,
    pub subtype: String,
    pub coll_id: String,
    pub name: String,
    pub year_published: Option<i32>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub status: CollectionStatus,
    pub stats: Option<CollectionStats>,
    pub num_plays: u32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub total_items: u32,
    pub pub_date: String,
    pub items: Vec<CollectionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaysQuery {
    pub id: Option<String>,
    pub min_date: Option<String>,
    pub max_date: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayItem {
    pub name: String,
    pub object_id: String,
    pub object_type: Option<String>,
    pub subtypes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayPlayer {
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub start_position: Option<String>,
    pub color: Option<String>,
    pub score: Option<String>,
    pub rating: Option<String>,
    pub new: bool,
    pub win: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub id: String,
    pub date: Option<String>,
    pub quantity: u32,
    pub length: u32,
    pub incomplete: bool,
    pub now_in_stats: bool,
    pub location: Option<String>,
    pub item: Option<PlayItem>,
    pub players: Vec<PlayPlayer>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayPage {
    pub username: String,
    pub total: u32,
    pub page: u32,
    pub plays: Vec<Play>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeeklistItem {
    pub id: String,
    pub object_type: Option<String>,
    pub subtype: Option<String>,
    pub object_id: Option<String>,
    pub object_name: Option<String>,
    pub username: Option<String>,
    pub post_date: Option<String>,
    pub edit_date: Option<String>,
    pub thumbs: u32,
    pub image_id: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geeklist {
    pub id: String,
    pub title: String,
    pub username: Option<String>,
    pub description: Option<String>,
    pub post_date: Option<String>,
    pub post_date_timestamp: Option<String>,
    pub edit_date: Option<String>,
    pub edit_date_timestamp: Option<String>,
    pub last_reply_date: Option<String>,
    pub last_reply_date_timestamp: Option<String>,
    pub num_items: u32,
    pub thumbs: u32,
    pub items: Vec<GeeklistItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_parses_case_insensitively() {
        let subtype: CollectionSubtype = "BOARDGAME".parse().unwrap();
        assert_eq!(subtype, CollectionSubtype::BoardGame);
        assert_eq!(subtype.to_string(), "boardgame");
        assert!("chess".parse::<CollectionSubtype>().is_err());
    }

    #[test]
    fn link_table_falls_back_to_other() {
        assert_eq!(LinkKind::from_upstream("boardgamemechanic"), LinkKind::Mechanic);
        assert_eq!(LinkKind::from_upstream("rpgperiodical"), LinkKind::Rpg);
        assert_eq!(LinkKind::from_upstream("videogamegenre"), LinkKind::Other);
        assert_eq!(LinkKind::from_upstream(""), LinkKind::Other);
    }
}
