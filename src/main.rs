use advanced_search::{
    parse_filter, AdvancedSearch, FilterList, ItemNode, SearchConfig, SqlCompiler,
};
use anyhow::Context;
use clap::Parser as _;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build advanced search requests from filter items or text filters.
#[derive(clap::Parser, Debug)]
#[command(name = "advanced-search", version)]
struct Args {
    /// JSON config with table mappings and state vocabularies
    #[arg(long, default_value = "search_config.json")]
    config: PathBuf,

    /// Model being searched
    #[arg(long, default_value = "Control")]
    model: String,

    /// JSON file with an item list; starts the REPL when omitted
    #[arg(long)]
    items: Option<PathBuf>,

    /// Also print the SQL preview
    #[arg(long)]
    sql: bool,
}

struct Session {
    config: SearchConfig,
    model: String,
    show_sql: bool,
}

impl Session {
    /// 校验条目，构建请求并打印JSON（可选打印SQL）
    fn run(&self, items: Vec<ItemNode>) -> anyhow::Result<()> {
        let mut search = AdvancedSearch::new(self.model.clone());
        search.filter_items = FilterList::from(items);
        if let Err(issues) = search.apply() {
            for issue in issues {
                println!("invalid item at {:?}: {}", issue.path, issue.message);
            }
            return Ok(());
        }

        let registry = self.config.state_registry();
        let request = search.build_request(&registry, self.config.main_query_type)?;
        println!("{}", request.to_json()?);

        if self.show_sql {
            let compiler = SqlCompiler::with_table_mapping(self.config.tables.clone());
            let compiled = compiler.compile(&request)?;
            for (i, statement) in compiled.statements.iter().enumerate() {
                let label = if i == request.main_index() { "main" } else { "ids" };
                println!("-- [{}] {} {}", i, label, statement);
            }
        }
        Ok(())
    }
}

/// 交互模式：每行输入一个文本过滤条件
fn repl(session: &Session) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("advanced search for {} (Ctrl-D to quit)", session.model);

    loop {
        match editor.readline("filter> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;

                match parse_filter(line, &session.model) {
                    Ok(items) => {
                        if let Err(e) = session.run(items) {
                            println!("error: {:#}", e);
                        }
                    }
                    Err(e) => match e.span {
                        Some(span) => println!("parse error at {}-{}: {}", span.start, span.end, e),
                        None => println!("parse error: {}", e),
                    },
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let session = Session {
        config: SearchConfig::load_or_default(&args.config),
        model: args.model,
        show_sql: args.sql,
    };

    match args.items {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let items: Vec<ItemNode> = serde_json::from_str(&content)
                .with_context(|| format!("cannot parse items in {}", path.display()))?;
            session.run(items)
        }
        None => repl(&session),
    }
}
