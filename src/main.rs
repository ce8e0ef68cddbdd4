use clap::{Arg, ArgAction, ArgMatches, Command};
use dronecfg::document::{ConfigDocument, DocumentFormat};
use dronecfg::logging::{self, LogConfig, LogOutput};
use dronecfg::models::Model;
use dronecfg::normalizer::{self, Schema};
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{error, info};

/// コマンドライン引数から得られる実行設定
#[derive(Debug, Clone)]
struct RunOptions {
    path: PathBuf,
    schema: Schema,
    format: Option<DocumentFormat>,
    bridges: bool,
}

fn build_cli() -> Command {
    Command::new("dronecfg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("シミュレーション設定ファイルの解析ツール")
        .long_about("ワールドとドローン一覧を記述した設定ファイル(JSON/YAML)を読み込み、\n\
                     1行目にワールド名、以降にドローンごとのコロン区切りレコードを出力します。")
        .arg(
            Arg::new("filepath")
                .value_name("FILE")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("設定ファイルのパス")
        )
        .arg(
            Arg::new("schema")
                .long("schema")
                .value_name("SCHEMA")
                .default_value("a")
                .value_parser(Schema::from_str)
                .help("レコードのスキーマ (a: model:name:pose:capacity + payload, b: model:pose + sensors)")
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .value_parser(DocumentFormat::from_str)
                .help("入力形式 (json, yaml)。省略時は拡張子から判定")
        )
        .arg(
            Arg::new("bridges")
                .long("bridges")
                .action(ArgAction::SetTrue)
                .help("機体ごとのブリッジ一覧も出力")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .value_parser(LogOutput::from_str)
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: info, -vv: debug, -vvv: trace)")
        )
}

fn log_config(matches: &ArgMatches) -> LogConfig {
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => logging::parse_log_level(level),
        None => logging::level_from_verbosity(matches.get_count("verbose")),
    };

    LogConfig {
        level,
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        log_dir: matches
            .get_one::<String>("log-dir")
            .cloned()
            .unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    }
}

fn run_options(matches: &ArgMatches) -> RunOptions {
    RunOptions {
        path: matches.get_one::<PathBuf>("filepath").cloned().unwrap_or_default(),
        schema: matches.get_one::<Schema>("schema").copied().unwrap_or_default(),
        format: matches.get_one::<DocumentFormat>("format").copied(),
        bridges: matches.get_flag("bridges"),
    }
}

fn main() {
    let matches = build_cli().get_matches();

    let _log_guard = match logging::init_logging(log_config(&matches)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("警告: ログ初期化に失敗しました: {}", e);
            None
        }
    };

    let options = run_options(&matches);

    if let Err(e) = run(&options) {
        error!(path = %options.path.display(), "{}", e);
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// 設定ファイルを読み込み、正規化結果を標準出力へ書き出す
///
/// `--bridges` 指定時にYAMLのトップレベルがモデル定義のリストであれば、
/// 正規化は行わずブリッジ一覧のみを出力します。
fn run(options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let document = ConfigDocument::from_file(&options.path, options.format)?;
    info!(path = %options.path.display(), format = %document.format, "設定ファイル読み込み完了");

    let model_list = options.bridges
        && document.format == DocumentFormat::Yaml
        && document.root.is_array();

    let config = if model_list {
        None
    } else {
        Some(normalizer::normalize(&document.root, options.schema)?)
    };
    let world = config
        .as_ref()
        .map_or(normalizer::NONE_LITERAL, |config| config.world.as_str());

    // 途中で失敗した場合に部分的な出力を残さない
    let bridges = if options.bridges {
        let models = Model::from_document(&document.root, document.format)?;
        Some(
            models
                .iter()
                .map(|model| (model.to_string(), model.bridges(world)))
                .collect::<Vec<_>>(),
        )
    } else {
        None
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(config) = &config {
        write!(out, "{}", config)?;
    }

    if let Some(bridges) = bridges {
        for (model, model_bridges) in bridges {
            writeln!(out, "{}", model)?;
            for bridge in model_bridges {
                writeln!(out, "  {}", bridge)?;
            }
        }
    }
    out.flush()?;

    Ok(())
}
