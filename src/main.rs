//! CLI binobj
//!
//! Конвертер бинарных объектных документов и RML в текстовую разметку и
//! обратно.

use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, Result};
use binobj::{
    config::Settings,
    document::{encode_document, read_document_with},
    logging::{init_logging, LoggingConfig},
    rml::{read_rml, write_rml, RmlDocument},
    schema::{load_dir, ObjectFileDefinition, SchemaGraph},
    text::{read_text_tree, write_text_tree, Exporter, Importer, SplitLayout},
    StackError,
};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

/// Основная структура CLI аргументов
#[derive(Parser)]
#[command(name = "binobj")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert binary object documents to markup and back", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Каталог с описаниями классов и файлов объектов
    #[arg(
        short,
        long,
        global = true,
        env = "BINOBJ_DEFINITIONS_PATH",
        help = "Directory with *.binaryclass.xml and *.binaryobjectfile.xml"
    )]
    definitions: Option<PathBuf>,
    /// Файл настроек
    #[arg(short, long, global = true, help = "Settings file (default: ./binobj.toml)")]
    config: Option<PathBuf>,
    /// Подробность логов, можно повторять
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Бинарный документ -> разметка
    Export {
        input: PathBuf,
        output: Option<PathBuf>,
        /// Имя или псевдоним описания файла объектов
        #[arg(long = "def")]
        def: Option<String>,
        /// Не раскладывать библиотеки по отдельным файлам
        #[arg(long = "no-split")]
        no_split: bool,
    },
    /// Разметка -> бинарный документ
    Import {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long = "def")]
        def: Option<String>,
    },
    /// Отдельный RML-файл -> разметка
    RmlToXml {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Разметка -> отдельный RML-файл
    XmlToRml {
        input: PathBuf,
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<StackError>()
            .map(|s| s.status_code().exit_code())
            .unwrap_or(1);
        process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    let logging: LoggingConfig = settings.log.clone().with_verbosity(cli.verbose);
    // Логирование не обязательно для конвертации.
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!(?settings, "settings loaded");

    let definitions = cli.definitions.clone().or_else(|| settings.definitions_path.clone());

    match cli.command {
        Commands::Export {
            input,
            output,
            def,
            no_split,
        } => {
            let schema = load_schema(definitions.as_deref())?;
            let bytes = fs::read(&input).with_context(|| format!("reading '{}'", input.display()))?;
            let document = read_document_with(&bytes, &settings.decode_options())
                .with_context(|| format!("decoding '{}'", input.display()))?;

            let def_name = def.unwrap_or_else(|| object_file_name(&input));
            let object_file = find_object_file(&schema, &def_name);
            let exporter = Exporter::new(&schema);
            let output = output.unwrap_or_else(|| append_extension(&input, "xml"));

            let layout = if no_split { None } else { SplitLayout::detect(&document) };
            let text = match layout {
                Some(layout) => {
                    let split = exporter.export_split(&document, object_file, layout)?;
                    // Импорт ищет внешние файлы в каталоге с именем входа без
                    // расширения.
                    split.write_files(&output.with_extension(""))?;
                    info!(?layout, files = split.files.len(), "split export");
                    split.root
                }
                None => exporter.export(&document, object_file)?,
            };
            write_output(&output, write_text_tree(&text)?.as_bytes())?;
            info!(input = %input.display(), output = %output.display(), "exported");
        }
        Commands::Import { input, output, def } => {
            let schema = load_schema(definitions.as_deref())?;
            let markup = fs::read_to_string(&input)
                .with_context(|| format!("reading '{}'", input.display()))?;
            let root = read_text_tree(&markup)?;

            let object_file = match &def {
                Some(name) => find_object_file(&schema, name),
                None => None,
            };
            let base = input.with_extension("");
            let document = Importer::new(&schema)
                .max_depth(settings.decode.max_depth)
                .import(&root, object_file, &base)
                .with_context(|| format!("importing '{}'", input.display()))?;

            let output = output.unwrap_or_else(|| import_output(&input));
            write_output(&output, &encode_document(&document)?)?;
            info!(input = %input.display(), output = %output.display(), "imported");
        }
        Commands::RmlToXml { input, output } => {
            let bytes = fs::read(&input).with_context(|| format!("reading '{}'", input.display()))?;
            let (rml, consumed) = read_rml(&bytes)?;
            if consumed != bytes.len() {
                warn!(trailing = bytes.len() - consumed, "trailing bytes after RML document");
            }
            let output = output.unwrap_or_else(|| append_extension(&input, "xml"));
            write_output(&output, write_text_tree(&rml.to_text_node())?.as_bytes())?;
        }
        Commands::XmlToRml { input, output } => {
            let markup = fs::read_to_string(&input)
                .with_context(|| format!("reading '{}'", input.display()))?;
            let rml = RmlDocument::from_text_node(&read_text_tree(&markup)?)?;
            let output = output.unwrap_or_else(|| import_output(&input));
            write_output(&output, &write_rml(&rml)?)?;
        }
    }
    Ok(())
}

/// Без каталога описаний работаем с пустой схемой: всё по хешам.
fn load_schema(dir: Option<&Path>) -> Result<SchemaGraph> {
    match dir {
        Some(dir) => Ok(load_dir(dir)?),
        None => {
            warn!("no definitions directory given, names and field types are unknown");
            Ok(SchemaGraph::empty())
        }
    }
}

fn find_object_file<'a>(
    schema: &'a SchemaGraph,
    name: &str,
) -> Option<&'a ObjectFileDefinition> {
    let found = schema.object_file(name);
    if found.is_none() {
        debug!(def = name, "no object file definition");
    }
    found
}

/// `level_converted.bin` -> `level`.
fn object_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.strip_suffix("_converted").map(str::to_string).unwrap_or(stem)
}

fn append_extension(
    path: &Path,
    extension: &str,
) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// `a.bin.xml` -> `a.bin`; без `.xml` дописывается `.fcb`.
fn import_output(input: &Path) -> PathBuf {
    let is_xml = input
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
    if is_xml {
        input.with_extension("")
    } else {
        append_extension(input, "fcb")
    }
}

fn write_output(
    path: &Path,
    bytes: &[u8],
) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing '{}'", path.display()))
}
