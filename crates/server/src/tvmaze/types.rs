//! TVMaze API response types.
//!
//! These mirror the catalog's JSON (camelCase fields, `_embedded` blocks) so
//! records can be passed through to the mini-app unchanged. Unknown fields
//! are dropped.

use serde::{Deserialize, Serialize};
use tvguide_core::{EpisodeId, ShowId};

/// A show as returned by `/shows/{id}`, `/shows?page=N` and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: ShowId,
    #[serde(default)]
    pub url: Option<String>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub average_runtime: Option<u32>,
    #[serde(default)]
    pub premiered: Option<String>,
    #[serde(default)]
    pub ended: Option<String>,
    #[serde(default)]
    pub official_site: Option<String>,
    #[serde(default)]
    pub schedule: Option<AirSchedule>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub network: Option<Network>,
    #[serde(default)]
    pub web_channel: Option<Network>,
    #[serde(default)]
    pub externals: Option<Externals>,
    #[serde(default)]
    pub image: Option<Image>,
    /// HTML fragment.
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub updated: Option<i64>,
    #[serde(
        default,
        rename = "_embedded",
        skip_serializing_if = "Option::is_none"
    )]
    pub embedded: Option<ShowEmbedded>,
}

/// Regular air time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirSchedule {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub days: Vec<String>,
}

/// Average user rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub average: Option<f64>,
}

/// Broadcast network or web channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: Option<Country>,
}

/// Country of a network or person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// IDs in other catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Externals {
    #[serde(default)]
    pub tvrage: Option<i64>,
    #[serde(default)]
    pub thetvdb: Option<i64>,
    #[serde(default)]
    pub imdb: Option<String>,
}

/// Poster or still image URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub medium: String,
    pub original: String,
}

/// Embedded resources requested with `embed[]=...`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShowEmbedded {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<Vec<Episode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<CastMember>>,
}

/// A single episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    #[serde(default)]
    pub url: Option<String>,
    pub name: String,
    pub season: i32,
    /// `None` for specials.
    #[serde(default)]
    pub number: Option<i32>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub airdate: Option<String>,
    #[serde(default)]
    pub airtime: Option<String>,
    #[serde(default)]
    pub airstamp: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Cast credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub person: Person,
    pub character: Character,
    /// Whether the person plays themselves.
    #[serde(default, rename = "self")]
    pub is_self: bool,
    #[serde(default)]
    pub voice: bool,
}

/// Cast person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    #[serde(default)]
    pub url: Option<String>,
    pub name: String,
    #[serde(default)]
    pub country: Option<Country>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub deathday: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
}

/// Character played by a cast member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    #[serde(default)]
    pub url: Option<String>,
    pub name: String,
    #[serde(default)]
    pub image: Option<Image>,
}

/// Ranked search hit from `/search/shows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub score: f64,
    pub show: Show,
}

/// Episode airing on a given day, from `/schedule/web`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    #[serde(flatten)]
    pub episode: Episode,
    #[serde(rename = "_embedded")]
    pub embedded: ScheduleEmbedded,
}

/// Show embedded in a schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEmbedded {
    pub show: Show,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn show_json() -> serde_json::Value {
        json!({
            "id": 169,
            "url": "https://www.tvmaze.com/shows/169/breaking-bad",
            "name": "Breaking Bad",
            "type": "Scripted",
            "language": "English",
            "genres": ["Drama", "Crime", "Thriller"],
            "status": "Ended",
            "runtime": 60,
            "averageRuntime": 60,
            "premiered": "2008-01-20",
            "ended": "2019-10-11",
            "officialSite": "http://www.amc.com/shows/breaking-bad",
            "schedule": { "time": "22:00", "days": ["Sunday"] },
            "rating": { "average": 9.2 },
            "network": {
                "id": 20,
                "name": "AMC",
                "country": { "name": "United States", "code": "US", "timezone": "America/New_York" }
            },
            "webChannel": null,
            "externals": { "tvrage": 18164, "thetvdb": 81189, "imdb": "tt0903747" },
            "image": {
                "medium": "https://static.tvmaze.com/uploads/images/medium_portrait/0/2400.jpg",
                "original": "https://static.tvmaze.com/uploads/images/original_untouched/0/2400.jpg"
            },
            "summary": "<p><b>Breaking Bad</b> follows Walter White.</p>",
            "updated": 1_704_794_122,
            "_links": { "self": { "href": "https://api.tvmaze.com/shows/169" } }
        })
    }

    #[test]
    fn test_show_deserializes_catalog_shape() {
        let show: Show = serde_json::from_value(show_json()).unwrap();

        assert_eq!(show.id, ShowId::new(169));
        assert_eq!(show.kind.as_deref(), Some("Scripted"));
        assert_eq!(show.average_runtime, Some(60));
        assert_eq!(show.network.as_ref().unwrap().name, "AMC");
        assert!(show.web_channel.is_none());
        assert!(show.embedded.is_none());
    }

    #[test]
    fn test_show_serializes_camel_case_for_web_app() {
        let show: Show = serde_json::from_value(show_json()).unwrap();
        let value = serde_json::to_value(&show).unwrap();

        assert_eq!(value["officialSite"], "http://www.amc.com/shows/breaking-bad");
        assert_eq!(value["type"], "Scripted");
        assert!(value.get("_embedded").is_none());
    }

    #[test]
    fn test_minimal_show() {
        let show: Show = serde_json::from_value(json!({ "id": 1, "name": "Pilot" })).unwrap();
        assert!(show.genres.is_empty());
        assert!(show.summary.is_none());
    }

    #[test]
    fn test_show_with_embedded_episodes_and_cast() {
        let mut value = show_json();
        value["_embedded"] = json!({
            "episodes": [{
                "id": 12192, "name": "Pilot", "season": 1, "number": 1,
                "airdate": "2008-01-20", "airtime": "22:00", "runtime": 60,
                "summary": null, "image": null
            }],
            "cast": [{
                "person": { "id": 14245, "name": "Bryan Cranston" },
                "character": { "id": 40, "name": "Walter White" },
                "self": false,
                "voice": false
            }]
        });

        let show: Show = serde_json::from_value(value).unwrap();
        let embedded = show.embedded.unwrap();
        assert_eq!(embedded.episodes.unwrap()[0].id, EpisodeId::new(12192));
        assert_eq!(embedded.cast.unwrap()[0].character.name, "Walter White");
    }

    #[test]
    fn test_schedule_item_flattens_episode() {
        let item: ScheduleItem = serde_json::from_value(json!({
            "id": 2_790_000,
            "name": "Episode 3",
            "season": 2,
            "number": null,
            "airdate": "2024-04-05",
            "airtime": "",
            "airstamp": "2024-04-05T12:00:00+00:00",
            "runtime": 45,
            "summary": "<p>Something happens.</p>",
            "_embedded": { "show": show_json() }
        }))
        .unwrap();

        assert_eq!(item.episode.season, 2);
        assert!(item.episode.number.is_none());
        assert_eq!(item.embedded.show.id, ShowId::new(169));
    }

    #[test]
    fn test_search_result() {
        let result: SearchResult =
            serde_json::from_value(json!({ "score": 0.91, "show": show_json() })).unwrap();
        assert_eq!(result.show.name, "Breaking Bad");
    }
}
