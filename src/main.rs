// ==========================================
// 奶牛选配系统 - 命令行入口
// ==========================================
// 子命令:
//   run     执行冻精分配并写入结果库
//   runs    列出历史运行
//   export  导出结果库中的分配宽表/公牛使用表
// ==========================================

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dairy_mating::api::AllocationApi;
use dairy_mating::config::AllocationConfig;
use dairy_mating::db::get_default_db_path;
use dairy_mating::domain::types::InbreedingThreshold;
use dairy_mating::engine::{AllocationInputs, CancellationToken, TracingProgress};
use dairy_mating::repository::CsvResultExporter;
use dairy_mating::{i18n, logging};
use std::path::PathBuf;

/// 奶牛选配系统 - 冻精分配
#[derive(Debug, Parser)]
#[command(name = "dairy-mating", version, about, long_about = None)]
struct Cli {
    /// 结果库路径
    #[arg(long, env = "DAIRY_MATING_DB_PATH", global = true)]
    db: Option<String>,

    /// 提示语言（zh-CN / en）
    #[arg(long, default_value = "zh-CN", global = true)]
    locale: String,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 执行冻精分配
    Run(RunArgs),
    /// 列出历史运行
    Runs,
    /// 导出分配结果
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// 育种指数表（含 牛号/分组/育种指数）
    #[arg(long)]
    animals: PathBuf,

    /// 冻精库存表（含 公牛号/冻精类型/数量）
    #[arg(long)]
    inventory: PathBuf,

    /// 选配推荐矩阵（含 牛号/公牛号/后代得分/近交系数）
    #[arg(long)]
    matrix: PathBuf,

    /// 分配设置 JSON；未指定时读取结果库中保存的设置
    #[arg(long)]
    config: Option<PathBuf>,

    /// 参与分配的分组（可重复）
    #[arg(long = "group")]
    groups: Vec<String>,

    /// 近交系数上限: 3.125% / 6.25% / 12.5% / 不限
    #[arg(long)]
    threshold: Option<String>,

    /// 开启隐性基因控制
    #[arg(long)]
    defect_control: bool,

    /// 每个冻精类型的选择轮数（1..=3）
    #[arg(long)]
    rounds: Option<usize>,

    /// 关闭兜底推荐
    #[arg(long)]
    no_advisory: bool,

    /// 只在下次配种方式对应的冻精类型中分配
    #[arg(long)]
    restrict_planned: bool,

    /// 分配完成后导出 CSV 的目录
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// 只导出该分组；不指定则导出全部
    #[arg(long)]
    group: Option<String>,

    /// 输出文件
    #[arg(long)]
    out: PathBuf,

    /// 改为导出该运行的公牛使用表
    #[arg(long, value_name = "RUN_ID")]
    sire_usage: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    i18n::set_locale(&cli.locale);

    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(version = dairy_mating::VERSION, db = %db_path, "{}", dairy_mating::APP_NAME);
    let api = AllocationApi::new(&db_path).context("无法打开结果库")?;

    match cli.command {
        Commands::Run(args) => run(&api, args),
        Commands::Runs => list_runs(&api),
        Commands::Export(args) => export(&api, args),
    }
}

fn run(api: &AllocationApi, args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AllocationConfig::from_json_file(path)
            .with_context(|| format!("读取分配设置失败 ({})", path.display()))?,
        None => api.load_config()?,
    };
    if !args.groups.is_empty() {
        config.selected_groups = args.groups.clone();
    }
    if let Some(raw) = &args.threshold {
        config.inbreeding_threshold = raw
            .parse::<InbreedingThreshold>()
            .map_err(anyhow::Error::msg)?;
    }
    if args.defect_control {
        config.control_defect_genes = true;
    }
    if let Some(rounds) = args.rounds {
        config.rounds = rounds;
    }
    if args.no_advisory {
        config.advisory_fallback = false;
    }
    if args.restrict_planned {
        config.restrict_to_planned_category = true;
    }

    let inputs = AllocationInputs {
        animals_path: args.animals,
        inventory_path: args.inventory,
        matrix_path: args.matrix,
    };
    let resp = api.run_allocation(&inputs, Some(config), &TracingProgress, &CancellationToken::new())?;

    println!("运行编号: {}", resp.run_id);
    println!("分配母牛: {}", resp.animals_allocated);
    println!("库存分配: {}  兜底推荐: {}", resp.strict_picks, resp.advisory_picks);
    for line in &resp.unassigned {
        println!("  {}", line);
    }
    if !resp.warnings.is_empty() {
        eprintln!("告警 {} 条:", resp.warnings.len());
        for w in &resp.warnings {
            eprintln!("  [{}] {}", w.kind(), w);
        }
    }

    if let Some(dir) = &args.export_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("无法创建导出目录 {}", dir.display()))?;
        let rows_path = dir.join(format!("assignments_{}.csv", resp.run_id));
        CsvResultExporter.export_assignments(&rows_path, &resp.rows)?;
        let usage_path = dir.join(format!("sire_usage_{}.csv", resp.run_id));
        api.export_sire_usage(&resp.run_id, &usage_path)?;
        println!("已导出: {}", rows_path.display());
        println!("已导出: {}", usage_path.display());
    }
    Ok(())
}

fn list_runs(api: &AllocationApi) -> Result<()> {
    let runs = api.list_runs()?;
    if runs.is_empty() {
        println!("结果库暂无分配运行");
        return Ok(());
    }
    for r in runs {
        println!(
            "{}  {}  分组={}  母牛={}  告警={}",
            r.run_id,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.groups.join("/"),
            r.animals_allocated,
            r.warning_count
        );
    }
    Ok(())
}

fn export(api: &AllocationApi, args: ExportArgs) -> Result<()> {
    let n = match &args.sire_usage {
        Some(run_id) => api.export_sire_usage(run_id, &args.out)?,
        None => api.export_rows(args.group.as_deref(), &args.out)?,
    };
    println!("已导出 {} 行: {}", n, args.out.display());
    Ok(())
}
