use std::str::FromStr;

use crate::domain::{
    Collection, CollectionItem, CollectionStats, CollectionStatus, EXPANSION_TYPE, Geeklist,
    GeeklistItem, Link, LinkKind, Play, PlayItem, PlayPage, PlayPlayer, Thing, ThingType, User,
    UserAddress,
};
use crate::xml::{TEXT_KEY, XmlDocument, XmlNode};

pub fn parse_number<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
}

pub fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    parse_number::<f64>(raw).filter(|value| value.is_finite())
}

pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1") | Some("true"))
}

fn owned(raw: Option<&str>) -> Option<String> {
    raw.map(str::to_string)
}

fn name_value(variant: &XmlNode) -> Option<&str> {
    let raw = match variant {
        XmlNode::Map(map) => map
            .get("value")
            .or_else(|| map.get(TEXT_KEY))
            .and_then(XmlNode::as_scalar),
        other => other.as_scalar(),
    };
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn is_primary(variant: &XmlNode) -> bool {
    variant.text("type") == Some("primary")
}

pub fn resolve_names(item: &XmlNode) -> (String, Vec<String>) {
    let variants = item.children("name");
    let chosen = variants
        .iter()
        .position(|variant| is_primary(variant))
        .or(if variants.is_empty() { None } else { Some(0) });

    let name = chosen
        .and_then(|index| variants.get(index))
        .and_then(|variant| name_value(variant))
        .unwrap_or_default()
        .to_string();
    let alternates = variants
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != chosen)
        .filter_map(|(_, variant)| name_value(variant))
        .map(str::to_string)
        .collect();
    (name, alternates)
}

pub fn normalize_link(link: &XmlNode) -> Link {
    let link_type = link.text("type").unwrap_or_default().to_string();
    let inbound = parse_flag(link.text("inbound"));
    let kind = match LinkKind::from_upstream(&link_type) {
        LinkKind::Expansion if inbound => LinkKind::BaseGame,
        kind => kind,
    };
    Link {
        kind,
        link_type,
        id: link.text("id").unwrap_or_default().to_string(),
        value: link.text("value").unwrap_or_default().to_string(),
        inbound,
    }
}

pub fn normalize_thing(item: &XmlNode) -> Thing {
    let (name, alternate_names) = resolve_names(item);
    let raw_type = item.text("type");
    let ratings = item
        .get("statistics")
        .and_then(|statistics| statistics.get("ratings"));
    let rating = |key: &str| ratings.and_then(|ratings| ratings.value_of(key));

    Thing {
        id: item.text("id").unwrap_or_default().to_string(),
        name,
        alternate_names,
        thing_type: raw_type.and_then(|value| value.parse::<ThingType>().ok()),
        is_expansion: raw_type == Some(EXPANSION_TYPE),
        rank: parse_number(item.text("rank")),
        description: owned(item.value_of("description")),
        image: owned(item.value_of("image")),
        thumbnail: owned(item.value_of("thumbnail")),
        year_published: parse_number(item.value_of("yearpublished")),
        min_players: parse_number(item.value_of("minplayers")),
        max_players: parse_number(item.value_of("maxplayers")),
        playing_time: parse_number(item.value_of("playingtime")),
        min_play_time: parse_number(item.value_of("minplaytime")),
        max_play_time: parse_number(item.value_of("maxplaytime")),
        min_age: parse_number(item.value_of("minage")),
        average: parse_decimal(rating("average")),
        bayes_average: parse_decimal(rating("bayesaverage")),
        users_rated: parse_number(rating("usersrated")),
        users_owned: parse_number(rating("owned")),
        users_wanting: parse_number(rating("wanting")),
        users_wishing: parse_number(rating("wishing")),
        num_comments: parse_number(rating("numcomments")),
        num_weights: parse_number(rating("numweights")),
        average_weight: parse_decimal(rating("averageweight")),
        links: item.children("link").into_iter().map(normalize_link).collect(),
    }
}

pub fn normalize_things(doc: &XmlDocument) -> Vec<Thing> {
    if doc.root != "items" {
        return Vec::new();
    }
    doc.body
        .children("item")
        .into_iter()
        .map(normalize_thing)
        .collect()
}

pub fn normalize_user(doc: &XmlDocument) -> Option<User> {
    if doc.root != "user" {
        return None;
    }
    let user = &doc.body;
    let id = user.text("id")?;
    let username = user.text("name")?;

    let state_or_province = owned(user.value_of("stateorprovince"));
    let country = owned(user.value_of("country"));
    let address = if state_or_province.is_some() || country.is_some() {
        Some(UserAddress {
            state_or_province,
            country,
        })
    } else {
        None
    };

    Some(User {
        id: id.to_string(),
        username: username.to_string(),
        first_name: owned(user.value_of("firstname")),
        last_name: owned(user.value_of("lastname")),
        avatar_link: owned(user.value_of("avatarlink")).filter(|link| link != "N/A"),
        year_registered: parse_number(user.value_of("yearregistered")),
        last_login: owned(user.value_of("lastlogin")),
        // Fixed default: 0.
        support_years: parse_number(user.value_of("supportyears")).unwrap_or(0),
        designer_id: owned(user.value_of("designerid")),
        publisher_id: owned(user.value_of("publisherid")),
        address,
    })
}

fn normalize_status(status: Option<&XmlNode>) -> CollectionStatus {
    let Some(status) = status else {
        return CollectionStatus::default();
    };
    CollectionStatus {
        own: parse_flag(status.text("own")),
        prev_owned: parse_flag(status.text("prevowned")),
        for_trade: parse_flag(status.text("fortrade")),
        want: parse_flag(status.text("want")),
        want_to_play: parse_flag(status.text("wanttoplay")),
        want_to_buy: parse_flag(status.text("wanttobuy")),
        wishlist: parse_flag(status.text("wishlist")),
        preordered: parse_flag(status.text("preordered")),
        last_modified: owned(status.text("lastmodified")),
    }
}

fn normalize_stats(stats: &XmlNode) -> CollectionStats {
    let rating = stats.get("rating");
    let rating_value = |key: &str| rating.and_then(|rating| rating.value_of(key));
    CollectionStats {
        min_players: parse_number(stats.text("minplayers")),
        max_players: parse_number(stats.text("maxplayers")),
        min_play_time: parse_number(stats.text("minplaytime")),
        max_play_time: parse_number(stats.text("maxplaytime")),
        playing_time: parse_number(stats.text("playingtime")),
        num_owned: parse_number(stats.text("numowned")),
        user_rating: parse_decimal(rating.and_then(|rating| rating.text("value"))),
        average: parse_decimal(rating_value("average")),
        bayes_average: parse_decimal(rating_value("bayesaverage")),
    }
}

pub fn normalize_collection_item(item: &XmlNode) -> CollectionItem {
    let (name, _) = resolve_names(item);
    CollectionItem {
        object_type: owned(item.text("objecttype")),
        object_id: item.text("objectid").unwrap_or_default().to_string(),
        subtype: item.text("subtype").unwrap_or_default().to_string(),
        coll_id: item.text("collid").unwrap_or_default().to_string(),
        name,
        year_published: parse_number(item.value_of("yearpublished")),
        image: owned(item.value_of("image")),
        thumbnail: owned(item.value_of("thumbnail")),
        status: normalize_status(item.get("status")),
        stats: item.get("stats").map(normalize_stats),
        // Fixed default: 0.
        num_plays: parse_number(item.value_of("numplays")).unwrap_or(0),
        comment: owned(item.value_of("comment")),
    }
}

pub fn normalize_collection(doc: &XmlDocument) -> Option<Collection> {
    if doc.root != "items" {
        return None;
    }
    let body = &doc.body;
    Some(Collection {
        // Fixed default: 0.
        total_items: parse_number(body.text("totalitems")).unwrap_or(0),
        pub_date: body.text("pubdate").unwrap_or_default().to_string(),
        items: body
            .children("item")
            .into_iter()
            .map(normalize_collection_item)
            .collect(),
    })
}

fn normalize_play_item(item: &XmlNode) -> PlayItem {
    let subtypes = item
        .get("subtypes")
        .map(|subtypes| subtypes.children("subtype"))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|subtype| name_value(subtype))
        .map(str::to_string)
        .collect();
    PlayItem {
        name: item.text("name").unwrap_or_default().to_string(),
        object_id: item.text("objectid").unwrap_or_default().to_string(),
        object_type: owned(item.text("objecttype")),
        subtypes,
    }
}

fn normalize_player(player: &XmlNode) -> PlayPlayer {
    PlayPlayer {
        username: owned(player.text("username")),
        user_id: owned(player.text("userid")).filter(|id| id != "0"),
        name: owned(player.text("name")),
        start_position: owned(player.text("startposition")),
        color: owned(player.text("color")),
        score: owned(player.text("score")),
        rating: owned(player.text("rating")),
        new: parse_flag(player.text("new")),
        win: parse_flag(player.text("win")),
    }
}

pub fn normalize_play(play: &XmlNode) -> Play {
    let players = play
        .get("players")
        .map(|players| players.children("player"))
        .unwrap_or_default()
        .into_iter()
        .map(normalize_player)
        .collect();
    Play {
        id: play.text("id").unwrap_or_default().to_string(),
        date: owned(play.text("date")),
        // Fixed defaults: quantity 1, length 0.
        quantity: parse_number(play.text("quantity")).unwrap_or(1),
        length: parse_number(play.text("length")).unwrap_or(0),
        incomplete: parse_flag(play.text("incomplete")),
        now_in_stats: parse_flag(play.text("nowinstats")),
        location: owned(play.text("location")),
        item: play.get("item").map(normalize_play_item),
        players,
        comments: owned(play.value_of("comments")),
    }
}

pub fn normalize_plays(doc: &XmlDocument, username: &str, requested_page: u32) -> PlayPage {
    if doc.root != "plays" {
        return PlayPage {
            username: username.to_string(),
            total: 0,
            page: requested_page,
            plays: Vec::new(),
        };
    }
    let body = &doc.body;
    PlayPage {
        username: body.text("username").unwrap_or(username).to_string(),
        total: parse_number(body.text("total")).unwrap_or(0),
        page: parse_number(body.text("page")).unwrap_or(requested_page),
        plays: body
            .children("play")
            .into_iter()
            .map(normalize_play)
            .collect(),
    }
}

fn normalize_geeklist_item(item: &XmlNode) -> GeeklistItem {
    GeeklistItem {
        id: item.text("id").unwrap_or_default().to_string(),
        object_type: owned(item.text("objecttype")),
        subtype: owned(item.text("subtype")),
        object_id: owned(item.text("objectid")),
        object_name: owned(item.text("objectname")),
        username: owned(item.text("username")),
        post_date: owned(item.text("postdate")),
        edit_date: owned(item.text("editdate")),
        thumbs: parse_number(item.value_of("thumbs")).unwrap_or(0),
        image_id: owned(item.text("imageid")).filter(|id| id != "0"),
        body: owned(item.value_of("body")),
    }
}

pub fn normalize_geeklist_node(geeklist: &XmlNode) -> Geeklist {
    Geeklist {
        id: geeklist.text("id").unwrap_or_default().to_string(),
        title: geeklist.value_of("title").unwrap_or_default().to_string(),
        username: owned(geeklist.value_of("username")),
        description: owned(geeklist.value_of("description")),
        post_date: owned(geeklist.value_of("postdate")),
        post_date_timestamp: owned(geeklist.value_of("postdate_timestamp")),
        edit_date: owned(geeklist.value_of("editdate")),
        edit_date_timestamp: owned(geeklist.value_of("editdate_timestamp")),
        last_reply_date: owned(geeklist.value_of("lastreplydate")),
        last_reply_date_timestamp: owned(geeklist.value_of("lastreplydate_timestamp")),
        // Fixed defaults: 0.
        num_items: parse_number(geeklist.value_of("numitems")).unwrap_or(0),
        thumbs: parse_number(geeklist.value_of("thumbs")).unwrap_or(0),
        items: geeklist
            .children("item")
            .into_iter()
            .map(normalize_geeklist_item)
            .collect(),
    }
}

pub fn normalize_geeklist(doc: &XmlDocument) -> Option<Geeklist> {
    if doc.root == "geeklist" {
        return Some(normalize_geeklist_node(&doc.body));
    }
    doc.body
        .children("geeklist")
        .into_iter()
        .next()
        .map(normalize_geeklist_node)
}

pub fn normalize_geeklists(doc: &XmlDocument) -> Vec<Geeklist> {
    if doc.root != "geeklists" {
        return Vec::new();
    }
    doc.body
        .children("geeklist")
        .into_iter()
        .map(normalize_geeklist_node)
        .collect()
}
