//! 命令行入口：翻译一个 HTML 文件并输出结果

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use clap::Parser;
use url::Url;

use live_translate::env::{core::LogLevel, EnvVar};
use live_translate::parsers::html::{html_to_dom, serialize_document, LiveDocument};
use live_translate::translation::{
    install_overlay, load_translation_config, ConfigManager, LibreTranslateClient,
    TranslationConfig, TranslationError, TranslationResult,
};

#[derive(Parser, Debug)]
#[command(name = "live-translate", version, about = "Translate the prose of an HTML page in place")]
struct Args {
    /// HTML file to translate, or '-' for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Page URL, checked against the allowed hosts
    #[arg(short, long)]
    url: Option<String>,

    /// Source language code (e.g. 'en')
    #[arg(short, long)]
    source: Option<String>,

    /// Target language code (e.g. 'fr')
    #[arg(short, long)]
    target: Option<String>,

    /// LibreTranslate-compatible /translate endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Number of text units per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Charset of the input document
    #[arg(long, default_value = "utf-8")]
    charset: String,
}

fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let level = LogLevel::get().unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        "info".to_string()
    });
    let level = tracing::Level::from_str(&level).unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &Args) -> TranslationResult<TranslationConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigManager::from_file(path)?.into_config(),
        None => load_translation_config(),
    };

    if let Some(source) = &args.source {
        config.source_lang = source.clone();
    }
    if let Some(target) = &args.target {
        config.target_lang = target.clone();
    }
    if let Some(api_url) = &args.api_url {
        config.api_url = api_url.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    config.validate()?;
    Ok(config)
}

fn read_input(input: &str) -> TranslationResult<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(input)
            .map_err(|e| TranslationError::InvalidInput(format!("无法读取 {}: {}", input, e)))
    }
}

fn run(args: Args) -> TranslationResult<()> {
    let config = load_config(&args)?;
    let url = args
        .url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .map_err(|e| TranslationError::InvalidInput(format!("页面地址无效: {}", e)))?;

    let data = read_input(&args.input)?;
    let mut document = LiveDocument::new(html_to_dom(&data, &args.charset), url);
    let client = Rc::new(LibreTranslateClient::new(&config)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async {
        let Some(overlay) = install_overlay(&mut document, &config, client)? else {
            return Ok(());
        };

        if let Some(pass) = overlay.initial_pass {
            let report = pass
                .await
                .map_err(|e| TranslationError::InternalError(format!("翻译任务异常结束: {}", e)))?;
            tracing::info!(
                "共提取 {} 个文本单元，写入 {} 个",
                report.units_extracted,
                report.units_written
            );
        }
        overlay.watcher.abort();
        Ok::<_, TranslationError>(())
    })?;

    let output = serialize_document(&document.document(), &args.charset)?;
    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => io::stdout().write_all(&output)?,
    }

    Ok(())
}
