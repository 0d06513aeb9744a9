//! 命令行入口
//!
//! 一个很薄的驱动程序：每条命令对应一个词汇服务操作，数据保存在配置的快照文件中。

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vocab_keeper::config::{ConfigManager, VocabConfig};
use vocab_keeper::{
    CreateVocabOutcome, EntryId, LookupProvider, MembershipChange, MemoryStore, UserId,
    VocabEntry, VocabError, VocabResult, VocabService, YandexDictionary,
};

#[derive(Parser, Debug)]
#[command(name = "vocab-keeper", version, about = "个人词汇本：查词、收藏、随机复习")]
struct Cli {
    /// 配置文件路径（TOML 或 JSON）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct UserArgs {
    /// 用户ID
    #[arg(short, long)]
    user: UserId,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 为用户创建词汇本
    Start(UserArgs),
    /// 查词并打印释义
    Lookup {
        word: String,
        #[command(flatten)]
        user: UserArgs,
    },
    /// 查词并加入词汇本
    Add {
        word: String,
        #[command(flatten)]
        user: UserArgs,
    },
    /// 把词移出词汇本
    Remove {
        word: String,
        #[command(flatten)]
        user: UserArgs,
    },
    /// 检查词是否在词汇本中
    Check {
        word: String,
        #[command(flatten)]
        user: UserArgs,
    },
    /// 列出词汇本中的全部词条
    List(UserArgs),
    /// 随机取一个词条复习
    Random {
        /// 尽量不选这个词条ID
        #[arg(short, long)]
        exclude: Option<EntryId>,
        #[command(flatten)]
        user: UserArgs,
    },
    /// 清空词汇本
    Clear(UserArgs),
    /// 生成示例配置文件
    InitConfig {
        #[arg(default_value = "vocab-keeper.toml")]
        path: PathBuf,
    },
    /// 打印支持的环境变量
    EnvDocs,
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(self, Command::List(_) | Command::Random { .. })
    }
}

/// 未配置令牌时的占位词典，只有真正需要外部查询时才报错
struct UnconfiguredDictionary {
    reason: String,
}

#[async_trait]
impl LookupProvider for UnconfiguredDictionary {
    async fn lookup(&self, _text: &str) -> VocabResult<Option<VocabEntry>> {
        Err(VocabError::Config(self.reason.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 不需要配置和存储的命令
    match &cli.command {
        Command::InitConfig { path } => {
            ConfigManager::generate_example_config(&path.to_string_lossy())?;
            println!("已生成示例配置: {}", path.display());
            return Ok(());
        }
        Command::EnvDocs => {
            print!("{}", vocab_keeper::env::generate_env_docs());
            return Ok(());
        }
        _ => {}
    }

    let config = match &cli.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    }
    .into_config();

    init_logging(&config)?;

    let store = Arc::new(MemoryStore::open(config.data_file_path()).await?);
    let provider: Arc<dyn LookupProvider> = match YandexDictionary::from_config(&config) {
        Ok(dictionary) => Arc::new(dictionary),
        Err(e) => {
            tracing::debug!("词典不可用: {}", e);
            Arc::new(UnconfiguredDictionary {
                reason: e.to_string(),
            })
        }
    };
    let service = VocabService::new(store.clone(), provider);

    let mutates = cli.command.mutates();
    let result = run(&service, cli.command).await;

    // 失败前可能已经写入了新词条，照样落盘
    if mutates {
        store.flush().await?;
    }

    let stats = service.stats();
    tracing::debug!(
        store_hits = stats.store_hits,
        external_lookups = stats.external_lookups,
        entries_created = stats.entries_created,
        "解析器统计"
    );

    result.map_err(Into::into)
}

fn init_logging(config: &VocabConfig) -> VocabResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let file_layer = match &config.log_file {
        Some(path) => {
            let path = shellexpand::tilde(path).into_owned();
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| VocabError::Config(format!("打开日志文件失败 {}: {}", path, e)))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn run(service: &VocabService, command: Command) -> VocabResult<()> {
    match command {
        Command::Start(UserArgs { user }) => match service.create_vocab(user).await? {
            CreateVocabOutcome::Created(vocab) => println!("已创建词汇本 {}", vocab.id),
            CreateVocabOutcome::AlreadyExists => println!("词汇本已存在"),
        },
        Command::Lookup { word, .. } => match service.resolve_by_text(&word).await? {
            Some(entry) => println!("{}", entry.full_desc(true)),
            None => println!("未找到: {}", word),
        },
        Command::Add { word, user } => {
            let Some(entry_id) = resolve_id(service, &word).await? else {
                return Ok(());
            };
            service.create_vocab(user.user).await?;
            match service.add_entry_to_user_vocab(entry_id, user.user).await? {
                MembershipChange::Applied => println!("已加入: {}", word),
                MembershipChange::AlreadyInState => println!("已在词汇本中: {}", word),
            }
        }
        Command::Remove { word, user } => {
            let Some(entry_id) = resolve_id(service, &word).await? else {
                return Ok(());
            };
            match service.remove_entry_from_user_vocab(entry_id, user.user).await? {
                MembershipChange::Applied => println!("已移出: {}", word),
                MembershipChange::AlreadyInState => println!("不在词汇本中: {}", word),
            }
        }
        Command::Check { word, user } => {
            let Some(entry_id) = resolve_id(service, &word).await? else {
                return Ok(());
            };
            if service.check_entry_in_user_vocab(entry_id, user.user).await? {
                println!("在词汇本中: {}", word);
            } else {
                println!("不在词汇本中: {}", word);
            }
        }
        Command::List(UserArgs { user }) => {
            let entries = service.list_entries(user).await?;
            if entries.is_empty() {
                println!("词汇本为空");
            }
            for entry in entries {
                println!(
                    "{}\t{}\t{}",
                    entry.id.unwrap_or_default(),
                    entry.text,
                    entry.main_translation().unwrap_or_default()
                );
            }
        }
        Command::Random { exclude, user } => {
            match service.pick_random_entry(user.user, exclude).await? {
                Some(entry) => {
                    println!("[{}]", entry.id.unwrap_or_default());
                    println!("{}", entry.full_desc(true));
                }
                None => println!("词汇本为空"),
            }
        }
        Command::Clear(UserArgs { user }) => {
            service.clear_user_vocab(user).await?;
            println!("词汇本已清空");
        }
        Command::InitConfig { .. } | Command::EnvDocs => {}
    }
    Ok(())
}

async fn resolve_id(service: &VocabService, word: &str) -> VocabResult<Option<EntryId>> {
    match service.resolve_by_text(word).await? {
        Some(VocabEntry { id: Some(id), .. }) => Ok(Some(id)),
        _ => {
            println!("未找到: {}", word);
            Ok(None)
        }
    }
}
