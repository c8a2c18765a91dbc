//! Query the live catalog through the same client and resolver the server uses.
//! Usage:
//!   cargo run --bin catalog_check -- popular [page]
//!   cargo run --bin catalog_check -- resolve <id> [<id> ...]
//!   cargo run --bin catalog_check -- resolve '[550,13]'
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, Context, Result};
use cinefav::catalog::{CatalogApi, CatalogClient};
use cinefav::config::Config;
use cinefav::navigation;
use cinefav::resolver::DetailResolver;
use dotenvy::dotenv;
use serde_json::json;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    let command = args
        .next()
        .ok_or_else(|| anyhow!("usage: catalog_check popular [page] | resolve <ids...>"))?;
    let rest: Vec<String> = args.collect();

    let config = Config::from_env()?;
    let client = CatalogClient::from_config(&config)?;

    match command.as_str() {
        "popular" => {
            let page = match rest.first() {
                Some(raw) => raw.parse::<u32>().context("page must be a positive integer")?,
                None => 1,
            };
            let movies = client.fetch_popular(page).await?;
            for movie in movies {
                println!(
                    "{}",
                    json!({ "id": movie.id, "title": movie.title, "poster": movie.poster_url() })
                );
            }
        }
        "resolve" => {
            let ids = parse_ids(&rest)?;
            let resolver = DetailResolver::new(Arc::new(client));
            let details = resolver.resolve_all(&ids).await?;
            eprintln!("resolved {} of {}", details.len(), ids.len());
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        other => return Err(anyhow!("unknown command '{}'", other)),
    }
    Ok(())
}

/// Accepts either bare ids or a single navigation-style JSON array.
fn parse_ids(args: &[String]) -> Result<Vec<i32>> {
    if let [single] = args {
        if single.trim_start().starts_with('[') {
            return Ok(navigation::decode_ids(Some(single)));
        }
    }
    args.iter()
        .map(|a| a.parse::<i32>().with_context(|| format!("not a movie id: {a}")))
        .collect()
}
