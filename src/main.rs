use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use esp_collection::io::{DefaultEspWriter, EspWriter};
use esp_collection::{
    AddFileOptions, Collection, CollectionConfig, FileId, LoadPolicy, LongFormId, RecordType,
    SUPPORTED_EXTENSIONS,
};

#[derive(Parser)]
#[command(name = "esp_collection")]
#[command(about = "加载一组ESP/ESM/ESL插件，查询记录、覆盖与冲突")]
#[command(version = "0.1.0")]
struct Cli {
    /// 插件所在的数据目录
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// 插件文件名，按加载顺序重复指定
    #[arg(short, long = "plugin")]
    plugins: Vec<String>,

    /// JSON 配置文件（与 --plugin 同时使用时先加载配置中的文件）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 显示每个文件的统计信息
    #[arg(long)]
    stats: bool,

    /// 列出某种记录类型的获胜版本
    #[arg(long, value_name = "TYPE")]
    list: Option<String>,

    /// 以 JSON 输出记录的获胜版本，格式 `00000800|Plugin.esp`
    #[arg(long, value_name = "LONG_FORMID")]
    dump: Option<String>,

    /// 列出被多个文件修改的记录
    #[arg(long)]
    conflicts: bool,

    /// 重编号文件的自有记录并设为轻量插件，随后保存
    #[arg(long, value_name = "FILE")]
    eslify: Option<String>,

    /// 测试模式：完整加载后重建每个文件，输出到 `*.rebuild`
    #[arg(long)]
    test_rebuild: bool,

    /// 完整解码所有记录（默认只读取组结构）
    #[arg(long)]
    full: bool,

    /// 静默模式(仅输出警告和错误)
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let mut collection = build_collection(&cli)?;

    if cli.test_rebuild {
        return handle_test_rebuild(&mut collection, cli.quiet);
    }

    if let Some(name) = &cli.eslify {
        return handle_eslify(&mut collection, name);
    }

    if let Some(text) = &cli.dump {
        return handle_dump(&collection, text);
    }

    if let Some(record_type) = &cli.list {
        return handle_list(&collection, record_type);
    }

    if cli.conflicts {
        return handle_conflicts(&collection);
    }

    // 默认模式：统计信息
    handle_stats(&collection)
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// 根据配置文件和命令行参数建立集合
fn build_collection(cli: &Cli) -> Result<Collection> {
    let mut config = match &cli.config {
        Some(path) => CollectionConfig::from_json_file(path)
            .with_context(|| format!("无法读取配置文件: {:?}", path))?,
        None => CollectionConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if cli.full || cli.test_rebuild {
        config.load_policy = LoadPolicy::Full;
    }

    for name in &cli.plugins {
        validate_extension(name)?;
    }
    if config.files.is_empty() && cli.plugins.is_empty() {
        bail!("没有指定插件：请使用 --plugin 或 --config");
    }

    let policy = config.load_policy;
    let mut collection = Collection::from_config(config)?;
    for name in &cli.plugins {
        if collection.lookup_file(name).is_some() {
            continue;
        }
        collection
            .add_file(name, AddFileOptions::default())
            .with_context(|| format!("无法添加插件: {}", name))?;
    }
    match policy {
        LoadPolicy::Full => collection.load_full()?,
        LoadPolicy::Minimal => collection.load_minimal()?,
    }
    Ok(collection)
}

/// 验证插件扩展名
fn validate_extension(name: &str) -> Result<()> {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if !SUPPORTED_EXTENSIONS.iter().any(|&ext| Some(ext) == extension.as_deref()) {
        bail!("插件必须是ESP、ESM或ESL文件: {}", name);
    }
    Ok(())
}

fn file_by_name(collection: &Collection, name: &str) -> Result<FileId> {
    collection
        .lookup_file(name)
        .with_context(|| format!("集合中没有文件: {}", name))
}

fn handle_stats(collection: &Collection) -> Result<()> {
    for (id, _) in collection.files() {
        println!("{}", collection.stats(id)?);
    }
    Ok(())
}

fn handle_list(collection: &Collection, record_type: &str) -> Result<()> {
    let record_type: RecordType = record_type.parse()?;
    let mut count = 0;
    for (id, _) in collection.files() {
        for handle in collection.records(id, record_type)? {
            if collection.is_deleted(handle)? || !collection.is_winning(handle)? {
                continue;
            }
            let long = collection.long_form_id(handle)?;
            let editor_id = collection.record(handle)?.editor_id().unwrap_or_default();
            let file = collection.file(handle.file)?.name();
            println!("{}  {:<32} [{}]", collection.display_long(&long), editor_id, file);
            count += 1;
        }
    }
    println!("共 {} 条 {} 记录", count, record_type);
    Ok(())
}

fn handle_dump(collection: &Collection, text: &str) -> Result<()> {
    let long: LongFormId = text.parse()?;
    let Some(handle) = collection.winning_record(&long) else {
        bail!("找不到记录: {}", text);
    };
    let value = collection.record_json(handle)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn handle_conflicts(collection: &Collection) -> Result<()> {
    let mut count = 0;
    for (id, file) in collection.files() {
        for rid in file.record_ids() {
            let handle = esp_collection::RecordHandle::new(id, rid);
            if collection.is_deleted(handle)? || !collection.is_winning(handle)? {
                continue;
            }
            let others = collection.conflicts(handle)?;
            if others.is_empty() {
                continue;
            }
            let long = collection.long_form_id(handle)?;
            let files: Vec<String> = std::iter::once(handle)
                .chain(others)
                .map(|h| collection.file(h.file).map(|f| f.name().to_string()))
                .collect::<Result<_, _>>()?;
            println!("{}  {}", collection.display_long(&long), files.join(" > "));
            count += 1;
        }
    }
    println!("共 {} 条记录存在覆盖冲突", count);
    Ok(())
}

fn handle_eslify(collection: &mut Collection, name: &str) -> Result<()> {
    let file = file_by_name(collection, name)?;
    collection.load_full()?;
    let changed = collection.compact_light(file)?;
    let path = collection.save(file)?;
    println!("ESL 重编号完成：{} 条记录被重新编号，已保存到 {:?}", changed, path);
    Ok(())
}

/// 处理测试重建模式
fn handle_test_rebuild(collection: &mut Collection, quiet: bool) -> Result<()> {
    let ids: Vec<FileId> = collection.load_order().to_vec();
    for id in ids {
        let file = collection.file(id)?;
        let bytes = file.to_bytes()?;
        let output = file.path().with_extension("rebuild");
        DefaultEspWriter
            .write(&bytes, &output)
            .with_context(|| format!("无法写入 {:?}", output))?;

        if !quiet {
            let original = std::fs::metadata(file.path()).map(|m| m.len()).unwrap_or(0);
            println!("{} -> {:?}", file.name(), output);
            println!("  原文件: {} 字节", original);
            println!("  重建文件: {} 字节", bytes.len());
        }
    }
    Ok(())
}
