//! Bedrinth browse commands
//!
//! Provides commands for searching the package index, listing tags and
//! showing package details.

use anyhow::{Context, Result};
use clap::Subcommand;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::info;

use bedrinth_core::catalog::{
    legacy_redirect, package_url, parse_timestamp, resolve, select, tag_facets, Catalog,
    DetailLoader, InfoSource, Package, PackageDetail, RegistryClient, Resolution, SearchIndex,
    SortBy, ViewState,
};
use bedrinth_core::{BedrinthConfig, CatalogError};

/// Prefix of the old detail route
const LEGACY_PREFIX: &str = "packages";

#[derive(Subcommand, Debug)]
pub enum BrowseCommand {
    /// Search packages by name, description and tags
    Search {
        /// Search query (searches name, description, tags)
        query: Option<String>,

        /// Only show packages carrying this tag (repeatable, all must match)
        #[clap(long = "tag")]
        tags: Vec<String>,

        /// Result order: relevance, updated or stars
        #[clap(long, default_value = "relevance")]
        sort: SortBy,

        /// Number of result pages to reveal
        #[clap(long, default_value_t = 1)]
        pages: usize,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },

    /// List tags with the number of packages carrying them
    Tags {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Show a package version (e.g. github.com/LiteLDev/LeviLamina@1.0.0)
    Show {
        /// Detail path; a leading /packages/ is treated as the legacy route
        path: String,

        /// Also print the README
        #[clap(long)]
        readme: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Print where a legacy /packages/... path redirects
    Legacy {
        /// Legacy path, with or without the /packages prefix
        path: String,
    },
}

impl BrowseCommand {
    pub async fn execute(self, config: BedrinthConfig) -> Result<()> {
        match self {
            BrowseCommand::Search {
                query,
                tags,
                sort,
                pages,
                json,
            } => execute_search(config, query, tags, sort, pages, json).await,
            BrowseCommand::Tags { json } => execute_tags(config, json).await,
            BrowseCommand::Show { path, readme, json } => {
                execute_show(config, &path, readme, json).await
            }
            BrowseCommand::Legacy { path } => execute_legacy(&path),
        }
    }
}

/// Split a route into non-empty segments
fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Segments after the legacy prefix, or `None` for a regular path
fn strip_legacy_prefix(segments: &[String]) -> Option<&[String]> {
    match segments.split_first() {
        Some((first, rest)) if first == LEGACY_PREFIX => Some(rest),
        _ => None,
    }
}

fn format_updated(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format("%Y-%m-%d").to_string(),
        None if raw.is_empty() => "-".to_string(),
        None => raw.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

async fn load_catalog(client: &RegistryClient) -> Result<Catalog> {
    info!("Fetching package index from {}", client.config().index_url);
    client
        .fetch_catalog()
        .await
        .context("Failed to load the package index")
}

/// Table row for search results
#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Stars")]
    stars: u64,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&Package> for SearchResultRow {
    fn from(pkg: &Package) -> Self {
        Self {
            name: pkg.info.name.clone(),
            latest: pkg.latest_version().unwrap_or("-").to_string(),
            stars: pkg.stars,
            updated: format_updated(&pkg.updated),
            tags: pkg.info.tags.join(", "),
            description: truncate(&pkg.info.description, 50),
        }
    }
}

fn package_json(pkg: &Package) -> serde_json::Value {
    serde_json::json!({
        "tooth": pkg.tooth,
        "name": pkg.info.name,
        "description": pkg.info.description,
        "tags": pkg.info.tags,
        "avatar_url": pkg.info.avatar_url,
        "stars": pkg.stars,
        "updated": pkg.updated,
        "latest_version": pkg.latest_version(),
        "url": package_url(&pkg.tooth, pkg.latest_version()),
    })
}

async fn execute_search(
    config: BedrinthConfig,
    query: Option<String>,
    tags: Vec<String>,
    sort: SortBy,
    pages: usize,
    json_output: bool,
) -> Result<()> {
    let page_size = config.page_size;
    let client = RegistryClient::from_config(config)?;
    let catalog = load_catalog(&client).await?;
    let index = SearchIndex::build(catalog.packages());

    let mut view = ViewState::new(page_size)
        .with_query(query.unwrap_or_default())
        .with_tags(tags)
        .with_sort(sort);
    let results = select(catalog.packages(), Some(&index), &view);
    for _ in 1..pages.max(1) {
        view = view.grow(results.len());
    }
    let shown = view.reveal().window(&results);

    if json_output {
        let json_results: Vec<serde_json::Value> =
            shown.iter().map(|pkg| package_json(pkg)).collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No packages found.");
        return Ok(());
    }

    let table_rows: Vec<SearchResultRow> = shown.iter().map(|pkg| (*pkg).into()).collect();
    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");

    if view.reveal().has_more(results.len()) {
        println!(
            "\nShowing {} of {} packages (use --pages {} to see more)",
            shown.len(),
            results.len(),
            pages.max(1) + 1
        );
    } else {
        println!("\nShowing {} packages. No more packages to load.", shown.len());
    }

    Ok(())
}

/// Table row for tag facets
#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Packages")]
    count: usize,
}

async fn execute_tags(config: BedrinthConfig, json_output: bool) -> Result<()> {
    let client = RegistryClient::from_config(config)?;
    let catalog = load_catalog(&client).await?;
    let facets = tag_facets(catalog.packages());

    if json_output {
        println!("{}", serde_json::to_string_pretty(&facets)?);
        return Ok(());
    }

    if facets.is_empty() {
        println!("No tags found.");
        return Ok(());
    }

    let rows: Vec<TagRow> = facets
        .into_iter()
        .map(|f| TagRow {
            tag: f.tag,
            count: f.count,
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");

    Ok(())
}

async fn execute_show(
    config: BedrinthConfig,
    path: &str,
    show_readme: bool,
    json_output: bool,
) -> Result<()> {
    let not_found = || CatalogError::NotFound {
        path: path.to_string(),
    };

    let requested = path_segments(path);
    let segments = match strip_legacy_prefix(&requested) {
        Some(rest) => {
            let location = legacy_redirect(rest).ok_or_else(not_found)?;
            if !json_output {
                println!("Redirecting to {location}");
            }
            path_segments(&location)
        }
        None => requested.clone(),
    };

    let client = RegistryClient::from_config(config)?;
    let catalog = load_catalog(&client).await?;

    let resolution = resolve(&segments, &catalog);
    if let Resolution::Redirect { location, .. } = &resolution {
        if !json_output {
            println!("Redirecting to {location}");
        }
    }
    let (package, version) = landing(resolution, &catalog).ok_or_else(not_found)?;

    let loader = DetailLoader::new(&client);
    let mut detail = loader
        .load(package, version)
        .await
        .context("Detail load was superseded")?;

    if json_output {
        if !show_readme {
            detail.readme = None;
        }
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    print_detail(&detail, show_readme);
    Ok(())
}

/// Package version a resolution ends up on; a redirect lands on the version it names
fn landing<'a>(resolution: Resolution<'a>, catalog: &'a Catalog) -> Option<(&'a Package, &'a str)> {
    match resolution {
        Resolution::Found {
            package, version, ..
        } => Some((package, version)),
        Resolution::Redirect { tooth, version, .. } => {
            catalog.get(tooth).map(|package| (package, version))
        }
        Resolution::NotFound => None,
    }
}

fn print_detail(detail: &PackageDetail, show_readme: bool) {
    let info = &detail.info.info;
    let name = if info.name.is_empty() {
        detail.tooth.as_str()
    } else {
        info.name.as_str()
    };

    println!();
    println!("Package:     {name}");
    println!("Tooth:       {}", detail.tooth);
    println!("Version:     {}", detail.version);
    if !info.description.is_empty() {
        println!("Description: {}", info.description);
    }
    if !detail.tags.is_empty() {
        println!("Tags:        {}", detail.tags.join(", "));
    }
    println!("Stars:       {}", detail.stars);
    println!("Updated:     {}", format_updated(&detail.updated));
    println!("Repository:  {}", detail.repository_url);
    if detail.info.source == InfoSource::Index {
        println!("(manifest unavailable, showing index info)");
    }

    println!("\nVersions:");
    for version in &detail.versions {
        let marker = if *version == detail.version { "*" } else { " " };
        println!(
            "  {marker} {version}  {}",
            package_url(&detail.tooth, Some(version))
        );
    }

    if show_readme {
        println!();
        match &detail.readme {
            Some(readme) => println!("{readme}"),
            None => println!("No README available for version {}", detail.version),
        }
    }
}

fn execute_legacy(path: &str) -> Result<()> {
    let segments = path_segments(path);
    let rest = strip_legacy_prefix(&segments).unwrap_or(&segments[..]);

    let location = legacy_redirect(rest).ok_or_else(|| CatalogError::NotFound {
        path: path.to_string(),
    })?;
    println!("{location}");
    Ok(())
}
