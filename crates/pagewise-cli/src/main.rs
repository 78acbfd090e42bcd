//! Pagewise command-line pager
//!
//! Loads a JSON entity dataset into memory and prints one page of a query
//! over it, with navigation links. Cursors can be kept in an on-disk store
//! so later invocations reach deep pages without offset queries.

mod formatter;
mod loader;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use formatter::{OutputFormat, PageView};
use pagewise_core::config::{PagingConfig, DEFAULT_LINK_WINDOW};
use pagewise_core::paging::{PageSize, PagedQuery, SledCursorStore};
use pagewise_core::prefetch::PrefetchingQuery;
use pagewise_proto::Value;
use tracing::{debug, info};

/// Pagewise command-line pager
#[derive(Parser, Debug)]
#[command(name = "pagewise")]
#[command(version, about = "Page through a JSON entity dataset")]
pub struct Args {
    /// Dataset file
    pub data: PathBuf,

    /// Entity kind to query
    #[arg(short, long)]
    pub kind: String,

    /// Page number, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Records per page
    #[arg(short = 's', long, default_value = "10")]
    pub page_size: PageSize,

    /// Restrict to descendants of a key, e.g. `Person:warwick`
    #[arg(short, long)]
    pub ancestor: Option<String>,

    /// Filter as `"<field> <op> <value>"`, repeatable
    #[arg(short, long)]
    pub filter: Vec<String>,

    /// Order clause, `field` or `-field`, repeatable
    #[arg(short, long)]
    pub order: Vec<String>,

    /// Fixed query text, e.g. `WHERE ANCESTOR IS :parent ORDER BY name`
    #[arg(long, conflicts_with_all = ["ancestor", "filter", "order"])]
    pub gql: Option<String>,

    /// Fixed query parameter as `name=value`, repeatable
    #[arg(long = "param", requires = "gql")]
    pub params: Vec<String>,

    /// Fields to prefetch, repeatable; `parent` names the parent entity
    #[arg(long)]
    pub prefetch: Vec<String>,

    /// On-disk cursor store shared between invocations
    #[arg(long)]
    pub cursor_db: Option<PathBuf>,

    /// Largest gap in pages closed by walking cursors instead of offsetting
    #[arg(long)]
    pub max_cursor_walk: Option<usize>,

    /// Base URL for page links
    #[arg(long, default_value = "/")]
    pub base_url: String,

    /// Query parameter carrying the page number in links
    #[arg(long, default_value = "page")]
    pub page_param: String,

    /// Number of page links around the current page
    #[arg(long, default_value_t = DEFAULT_LINK_WINDOW)]
    pub window: usize,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Log paging decisions (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "pagewise=debug,pagewise_core=debug,warn"
    } else {
        "pagewise=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = loader::load_file(&args.data)?;
    info!(entities = store.len(), path = %args.data.display(), "loaded dataset");

    let query = match &args.gql {
        Some(text) => {
            let params = parse_params(&args.params)?;
            store.gql(args.kind.clone(), text.clone(), params)?
        }
        None => store.query(args.kind.clone()),
    };

    let mut prefetching = PrefetchingQuery::new(query, store.clone());
    if !args.prefetch.is_empty() {
        prefetching.set_properties_to_prefetch(args.prefetch.iter().map(String::as_str))?;
    }

    let mut config = PagingConfig::new().with_link_window(args.window);
    if let Some(walk) = args.max_cursor_walk {
        config = config.with_max_cursor_walk(walk);
    }

    let mut paged = PagedQuery::new(prefetching, args.page_size.get())?.with_config(config);
    if let Some(path) = &args.cursor_db {
        paged = paged.with_cursor_store(Arc::new(SledCursorStore::open(path)?));
    }

    if args.gql.is_none() {
        if let Some(ancestor) = &args.ancestor {
            paged.ancestor(loader::parse_key(ancestor)?)?;
        }
        for filter in &args.filter {
            let (expr, value) = split_filter(filter)?;
            paged.filter(&expr, value)?;
        }
        for order in &args.order {
            paged.order(order)?;
        }
    }
    debug!(id = %paged.id()?, "query identity");

    let records = paged.fetch_page(args.page)?;
    let page_count = paged.page_count()?;
    let links = if page_count == 0 || args.page > page_count {
        Vec::new()
    } else {
        paged.links(args.page, &args.base_url, &args.page_param)?
    };

    let view = PageView {
        page: args.page,
        page_count,
        records,
        links,
        stats: paged.stats(),
    };
    println!("{}", formatter::render(&view, args.format));

    info!(
        offset_queries = view.stats.offset_queries,
        restores = view.stats.restores,
        persists = view.stats.persists,
        resolved = paged.query().stats().keys_resolved(),
        "page served"
    );
    Ok(())
}

/// Split `"<field> <op> <value>"` into the filter expression and its value.
fn split_filter(text: &str) -> Result<(String, Value), Box<dyn std::error::Error>> {
    let mut parts = text.trim().splitn(3, char::is_whitespace);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(op), Some(raw)) if !raw.trim().is_empty() => {
            Ok((format!("{field} {op}"), loader::parse_literal(raw.trim())?))
        }
        _ => Err(format!("filter '{text}' must be '<field> <op> <value>'").into()),
    }
}

/// Parse `name=value` parameters.
fn parse_params(params: &[String]) -> Result<Vec<(String, Value)>, Box<dyn std::error::Error>> {
    params
        .iter()
        .map(|param| -> Result<(String, Value), Box<dyn std::error::Error>> {
            let (name, raw) = param
                .split_once('=')
                .ok_or_else(|| format!("parameter '{param}' must be 'name=value'"))?;
            // Parameters that parse as keys bind as keys, for ANCESTOR IS.
            let value = match loader::parse_key(raw) {
                Ok(key) if raw.contains(':') => Value::Key(key),
                _ => loader::parse_literal(raw)?,
            };
            Ok((name.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewise_proto::Key;

    #[test]
    fn test_split_filter() {
        let (expr, value) = split_filter("birthdate > 1981-01-01").unwrap();
        assert_eq!(expr, "birthdate >");
        assert_eq!(value, Value::date(1981, 1, 1));

        let (expr, value) = split_filter("name = Kate Smith").unwrap();
        assert_eq!(expr, "name =");
        assert_eq!(value, Value::from("Kate Smith"));

        assert!(split_filter("name =").is_err());
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["parent=Person:warwick".into(), "n=3".into()]).unwrap();
        assert_eq!(params[0], ("parent".into(), Value::Key(Key::new("Person", "warwick"))));
        assert_eq!(params[1], ("n".into(), Value::Int64(3)));
        assert!(parse_params(&["novalue".into()]).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "pagewise", "people.json", "--kind", "Person", "--page", "2", "-s", "2", "--order",
            "birthdate", "--order", "name",
        ])
        .unwrap();
        assert_eq!(args.page, 2);
        assert_eq!(args.page_size.get(), 2);
        assert_eq!(args.order, vec!["birthdate", "name"]);

        assert!(Args::try_parse_from(["pagewise", "p.json", "-k", "P", "-s", "0"]).is_err());
        assert!(Args::try_parse_from([
            "pagewise", "p.json", "-k", "P", "--gql", "ORDER BY name", "--order", "name"
        ])
        .is_err());
    }
}
