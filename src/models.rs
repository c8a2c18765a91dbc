use serde::{Deserialize, Serialize};

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const MISSING_OVERVIEW: &str = "Sinopse não disponível.";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetail {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    // TMDB sends null for unreleased titles.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl MovieSummary {
    pub fn poster_url(&self) -> Option<String> {
        poster_url(self.poster_path.as_deref())
    }
}

impl MovieDetail {
    pub fn poster_url(&self) -> Option<String> {
        poster_url(self.poster_path.as_deref())
    }

    /// Vote average with one decimal, clamped to the catalog's 0-10 scale.
    pub fn rating_label(&self) -> String {
        format!("{:.1}", self.vote_average.clamp(0.0, 10.0))
    }

    /// Overview text, or a placeholder when the catalog has none for this locale.
    pub fn overview_label(&self) -> &str {
        let text = self.overview.trim();
        if text.is_empty() {
            MISSING_OVERVIEW
        } else {
            text
        }
    }

    pub fn genre_names(&self) -> String {
        self.genres
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
        }
    }
}

fn poster_url(path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{POSTER_BASE}{p}"))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Case-insensitive substring match on titles. An empty query keeps everything.
pub fn filter_by_title<'a>(movies: &'a [MovieSummary], query: &str) -> Vec<&'a MovieSummary> {
    let needle = query.trim().to_lowercase();
    movies
        .iter()
        .filter(|m| needle.is_empty() || m.title.to_lowercase().contains(&needle))
        .collect()
}
