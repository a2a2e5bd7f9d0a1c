use clap::{Args as ClapArgs, Parser, Subcommand};
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use url::Url;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Command-line client for a running Reel server", long_about = None)]
struct Args {
    #[clap(long, env = "REEL_SERVER", default_value = "http://127.0.0.1:1234")]
    server: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List movies, optionally by genre or one page at a time
    List {
        #[clap(long, conflicts_with = "page")]
        genre: Option<String>,
        #[clap(long)]
        page: Option<u64>,
        #[clap(long, requires = "page")]
        per_page: Option<usize>,
    },
    /// Show one movie
    Get { id: String },
    /// Create a movie
    Add(MovieArgs),
    /// Change some fields of a movie
    Update {
        id: String,
        #[clap(flatten)]
        fields: MovieArgs,
    },
    /// Remove a movie
    Delete { id: String },
}

/// Fields are sent as given; the server does the validating.
#[derive(ClapArgs, Debug, Default, Clone)]
struct MovieArgs {
    #[clap(long)]
    title: Option<String>,
    #[clap(long)]
    year: Option<i64>,
    #[clap(long)]
    director: Option<String>,
    #[clap(long)]
    duration: Option<i64>,
    #[clap(long)]
    rate: Option<f64>,
    #[clap(long)]
    poster: Option<String>,
    /// Repeat for several tags
    #[clap(long = "genre")]
    genres: Vec<String>,
}

impl MovieArgs {
    fn to_json(&self) -> Value {
        let mut body = Map::new();
        if let Some(v) = &self.title { body.insert("title".into(), v.clone().into()); }
        if let Some(v) = self.year { body.insert("year".into(), v.into()); }
        if let Some(v) = &self.director { body.insert("director".into(), v.clone().into()); }
        if let Some(v) = self.duration { body.insert("duration".into(), v.into()); }
        if let Some(v) = self.rate { body.insert("rate".into(), v.into()); }
        if let Some(v) = &self.poster { body.insert("poster".into(), v.clone().into()); }
        if !self.genres.is_empty() {
            body.insert("genre".into(), self.genres.clone().into());
        }
        Value::Object(body)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let base = match Url::parse(&args.server) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("[\u{2717}] Invalid server URL '{}': {}", args.server, e);
            std::process::exit(2);
        }
    };

    if let Err(e) = execute_command(&Client::new(), &base, args.command).await {
        eprintln!("[\u{26a0}\u{fe0f} Error] {}", e);
        std::process::exit(1);
    }
}

async fn execute_command(client: &Client, base: &Url, cmd: Command) -> Result<(), String> {
    match cmd {
        Command::List { genre, page, per_page } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(g) = genre { query.push(("genre", g)); }
            if let Some(p) = page { query.push(("pag", p.to_string())); }
            if let Some(q) = per_page { query.push(("qt", q.to_string())); }

            let url = endpoint(base, &["movies"])?;
            perform(client.get(url).query(&query)).await
        }
        Command::Get { id } => {
            let url = endpoint(base, &["movies", &id])?;
            perform(client.get(url)).await
        }
        Command::Add(fields) => {
            let url = endpoint(base, &["movies"])?;
            perform(client.post(url).json(&fields.to_json())).await
        }
        Command::Update { id, fields } => {
            let url = endpoint(base, &["movies", &id])?;
            perform(client.request(Method::PATCH, url).json(&fields.to_json())).await
        }
        Command::Delete { id } => {
            let url = endpoint(base, &["movies", &id])?;
            perform(client.delete(url)).await?;
            println!("[\u{2713} OK] Deleted ID: {}", id);
            Ok(())
        }
    }
}

/// Appends percent-encoded segments to the server URL, keeping any base path.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, String> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("'{}' cannot be used as a server URL", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// --- NETWORK ---

async fn perform(request: reqwest::RequestBuilder) -> Result<(), String> {
    let resp = request
        .send()
        .await
        .map_err(|e| format!("Could not reach server: {}", e))?;

    let status = resp.status();
    let text = resp.text().await.map_err(|e| e.to_string())?;
    let body = pretty(&text);

    if status.is_success() {
        if !body.is_empty() {
            println!("{}", body);
        }
        Ok(())
    } else {
        Err(format!("Server responded {}\n{}", status, body))
    }
}

fn pretty(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(v) => serde_json::to_string_pretty(&v).unwrap_or_else(|_| text.to_string()),
        Err(_) => text.to_string(),
    }
}
