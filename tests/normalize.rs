mod common;

use bgg_gateway::domain::{LinkKind, ThingType};
use bgg_gateway::normalize::{
    normalize_collection, normalize_geeklist, normalize_geeklists, normalize_plays,
    normalize_things, normalize_user,
};
use bgg_gateway::xml::parse_document;

use common::fixture;

#[test]
fn thing_names_prefer_the_primary_variant() {
    let doc = parse_document(&fixture("thing.xml")).unwrap();
    let things = normalize_things(&doc);

    assert_eq!(things.len(), 2);
    let catan = &things[0];
    assert_eq!(catan.id, "13");
    assert_eq!(catan.name, "CATAN");
    assert_eq!(
        catan.alternate_names,
        vec!["Die Siedler von Catan", "Settlers of Catan"]
    );
    assert_eq!(catan.thing_type, Some(ThingType::BoardGame));
    assert!(!catan.is_expansion);
}

#[test]
fn thing_fields_follow_the_default_policy() {
    let doc = parse_document(&fixture("thing.xml")).unwrap();
    let things = normalize_things(&doc);
    let catan = &things[0];

    assert_eq!(catan.year_published, Some(1995));
    assert_eq!(catan.min_players, Some(3));
    assert_eq!(catan.max_players, Some(4));
    assert_eq!(catan.playing_time, Some(120));
    assert_eq!(catan.min_age, None);
    assert_eq!(catan.average, Some(7.09));
    assert_eq!(catan.bayes_average, Some(6.92));
    assert_eq!(catan.users_rated, Some(125_000));
    assert_eq!(catan.users_owned, Some(190_000));
    assert_eq!(catan.average_weight, Some(2.29));
    assert_eq!(catan.rank, None);
    assert!(catan.description.as_deref().unwrap().starts_with("In CATAN"));
    assert_eq!(
        catan.thumbnail.as_deref(),
        Some("https://cf.geekdo-images.com/thumb/catan.jpg")
    );

    let seafarers = &things[1];
    assert_eq!(seafarers.average, None);
    assert_eq!(seafarers.users_rated, None);
    assert_eq!(seafarers.playing_time, None);
    assert_eq!(seafarers.description, None);
}

#[test]
fn sparse_thing_leaves_every_missing_field_absent() {
    let things = normalize_things(&parse_document(&fixture("sparse_thing.xml")).unwrap());
    let thing = &things[0];

    assert_eq!(thing.name, "Prototype");
    assert!(thing.alternate_names.is_empty());
    assert_eq!(thing.playing_time, Some(45));
    assert_eq!(thing.year_published, None);
    assert_eq!(thing.min_players, None);
    assert_eq!(thing.max_players, None);
    assert_eq!(thing.min_play_time, None);
    assert_eq!(thing.max_play_time, None);
    assert_eq!(thing.min_age, None);
    assert_eq!(thing.description, None);
    assert_eq!(thing.image, None);
    assert_eq!(thing.thumbnail, None);
    assert_eq!(thing.rank, None);
    assert_eq!(thing.users_rated, Some(3));
    assert_eq!(thing.average, Some(6.5));
    assert_eq!(thing.bayes_average, None);
    assert_eq!(thing.users_owned, None);
    assert_eq!(thing.users_wanting, None);
    assert_eq!(thing.users_wishing, None);
    assert_eq!(thing.num_comments, None);
    assert_eq!(thing.num_weights, None);
    assert_eq!(thing.average_weight, None);
    assert!(thing.links.is_empty());
}

#[test]
fn sparse_collection_uses_fixed_defaults() {
    let collection =
        normalize_collection(&parse_document(&fixture("sparse_collection.xml")).unwrap()).unwrap();

    assert_eq!(collection.total_items, 0);
    assert_eq!(collection.pub_date, "");
    let item = &collection.items[0];
    assert_eq!(item.name, "Prototype");
    assert_eq!(item.year_published, None);
    assert_eq!(item.stats, None);
    assert_eq!(item.image, None);
    assert_eq!(item.comment, None);
    assert_eq!(item.num_plays, 0);
    assert!(item.status.own);
    assert!(!item.status.wishlist);
    assert_eq!(item.status.last_modified, None);
}

#[test]
fn sparse_user_leaves_optional_fields_absent() {
    let user = normalize_user(&parse_document(&fixture("sparse_user.xml")).unwrap()).unwrap();

    assert_eq!(user.id, "654321");
    assert_eq!(user.first_name.as_deref(), Some("New"));
    assert_eq!(user.last_name, None);
    assert_eq!(user.avatar_link, None);
    assert_eq!(user.year_registered, None);
    assert_eq!(user.last_login, None);
    assert_eq!(user.support_years, 0);
    assert_eq!(user.publisher_id, None);
    assert_eq!(user.address, None);
}

#[test]
fn sparse_geeklist_counts_default_to_zero() {
    let geeklist =
        normalize_geeklist(&parse_document(&fixture("sparse_geeklist.xml")).unwrap()).unwrap();

    assert_eq!(geeklist.title, "Untitled drafts");
    assert_eq!(geeklist.num_items, 0);
    assert_eq!(geeklist.thumbs, 0);
    assert_eq!(geeklist.description, None);
    assert_eq!(geeklist.post_date, None);
    assert_eq!(geeklist.items.len(), 1);
    assert_eq!(geeklist.items[0].thumbs, 0);
    assert_eq!(geeklist.items[0].image_id, None);
    assert_eq!(geeklist.items[0].body, None);
}

#[test]
fn expansion_links_are_split_by_direction() {
    let doc = parse_document(&fixture("thing.xml")).unwrap();
    let things = normalize_things(&doc);

    let catan = &things[0];
    let expansions = catan.expansion_links();
    assert_eq!(expansions.len(), 1);
    assert_eq!(expansions[0].id, "926");
    assert!(catan.base_game_link().is_none());
    assert_eq!(catan.links_of(LinkKind::Designer).count(), 1);

    let seafarers = &things[1];
    assert!(seafarers.is_expansion);
    assert_eq!(seafarers.thing_type, Some(ThingType::BoardGameExpansion));
    let base = seafarers.base_game_link().unwrap();
    assert_eq!(base.id, "13");
    assert_eq!(base.kind, LinkKind::BaseGame);
    assert!(base.inbound);
    assert!(seafarers.expansion_links().is_empty());
}

#[test]
fn search_and_hot_lists_normalize_to_things() {
    let search = normalize_things(&parse_document(&fixture("search.xml")).unwrap());
    assert_eq!(search.len(), 2);
    assert_eq!(search[1].name, "CATAN: Seafarers");
    assert_eq!(search[1].year_published, None);

    let hot = normalize_things(&parse_document(&fixture("hot.xml")).unwrap());
    assert_eq!(hot.len(), 2);
    assert_eq!(hot[0].rank, Some(1));
    assert_eq!(hot[0].name, "Brass: Birmingham");
    assert_eq!(hot[0].thing_type, None);
    assert_eq!(
        hot[1].thumbnail.as_deref(),
        Some("https://cf.geekdo-images.com/thumb/gloomhaven.jpg")
    );
}

#[test]
fn user_profile_normalizes_address_and_defaults() {
    let user = normalize_user(&parse_document(&fixture("user.xml")).unwrap()).unwrap();

    assert_eq!(user.id, "123456");
    assert_eq!(user.username, "stevmachine");
    assert_eq!(user.first_name.as_deref(), Some("Steve"));
    assert_eq!(user.avatar_link, None);
    assert_eq!(user.year_registered, Some(2009));
    assert_eq!(user.support_years, 0);
    assert_eq!(user.designer_id, None);
    let address = user.address.unwrap();
    assert_eq!(address.state_or_province.as_deref(), Some("Oregon"));
    assert_eq!(address.country.as_deref(), Some("United States"));
}

#[test]
fn error_documents_are_no_result() {
    let errors = parse_document(&fixture("errors.xml")).unwrap();

    assert!(normalize_user(&errors).is_none());
    assert!(normalize_things(&errors).is_empty());
    assert!(normalize_geeklist(&errors).is_none());
    assert!(normalize_geeklists(&errors).is_empty());
    let page = normalize_plays(&errors, "bob", 3);
    assert_eq!(page.total, 0);
    assert_eq!(page.page, 3);
    assert!(page.plays.is_empty());
}

#[test]
fn plays_page_carries_players_and_defaults() {
    let page = normalize_plays(&parse_document(&fixture("plays.xml")).unwrap(), "ignored", 1);

    assert_eq!(page.username, "stevmachine");
    assert_eq!(page.total, 142);
    assert_eq!(page.page, 2);
    assert_eq!(page.plays.len(), 2);

    let first = &page.plays[0];
    assert_eq!(first.quantity, 2);
    assert_eq!(first.length, 90);
    assert!(first.now_in_stats);
    assert_eq!(first.comments.as_deref(), Some("Longest road decided it."));
    let item = first.item.as_ref().unwrap();
    assert_eq!(item.object_id, "13");
    assert_eq!(item.subtypes, vec!["boardgame"]);
    assert_eq!(first.players.len(), 2);
    assert!(first.players[0].win);
    assert_eq!(first.players[0].start_position.as_deref(), Some("1"));
    assert_eq!(first.players[1].user_id, None);
    assert_eq!(first.players[1].start_position, None);
    assert!(first.players[1].new);

    let second = &page.plays[1];
    assert_eq!(second.quantity, 1);
    assert_eq!(second.length, 0);
    assert_eq!(second.location, None);
    assert!(second.players.is_empty());
}

#[test]
fn geeklist_items_normalize() {
    let geeklist = normalize_geeklist(&parse_document(&fixture("geeklist.xml")).unwrap()).unwrap();

    assert_eq!(geeklist.id, "331520");
    assert_eq!(geeklist.title, "Gateway games for new players");
    assert_eq!(geeklist.username.as_deref(), Some("stevmachine"));
    assert_eq!(geeklist.num_items, 2);
    assert_eq!(geeklist.thumbs, 12);
    assert_eq!(geeklist.items.len(), 2);
    assert_eq!(geeklist.items[0].thumbs, 3);
    assert_eq!(geeklist.items[0].image_id, None);
    assert_eq!(geeklist.items[0].body.as_deref(), Some("Still the classic."));
    assert_eq!(geeklist.items[1].thumbs, 0);
    assert_eq!(geeklist.items[1].image_id.as_deref(), Some("5521"));
}

#[test]
fn geeklists_for_user() {
    let geeklists = normalize_geeklists(&parse_document(&fixture("geeklists.xml")).unwrap());

    assert_eq!(geeklists.len(), 1);
    assert_eq!(geeklists[0].id, "331520");
    assert_eq!(geeklists[0].num_items, 2);
    assert!(geeklists[0].items.is_empty());
}

#[test]
fn normalization_is_deterministic() {
    let body = fixture("thing.xml");
    let first = normalize_things(&parse_document(&body).unwrap());
    let second = normalize_things(&parse_document(&body).unwrap());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
