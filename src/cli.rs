use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};
use inquire::Password;

use postcode::config::{Config, ConfigLoader};
use postcode::flows;
use postcode::http::TransportOptions;
use postcode::model::{ItemKind, RequestSpec};
use postcode::prompt::InquirePrompter;
use postcode::utils::{ResponseFormat, ResponseFormatter};
use postcode::Workbench;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 关闭彩色输出
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 发送 JSON 请求描述文件
    Send {
        spec: PathBuf,
        #[command(flatten)]
        output: SendArgs,
    },
    /// 发送已保存的请求（合并凭据库中的凭据）
    Run {
        id: String,
        #[command(flatten)]
        output: SendArgs,
    },
    /// 管理集合
    #[command(subcommand)]
    Collection(CollectionCommand),
    /// 管理已保存的请求
    #[command(subcommand)]
    Request(RequestCommand),
    /// 管理全局凭据
    #[command(subcommand)]
    Secret(SecretCommand),
    /// 检查集合存储与凭据库是否一致
    Check {
        /// 删除孤立凭据
        #[arg(long)]
        prune: bool,
    },
}

#[derive(Args)]
pub struct SendArgs {
    /// 不校验 TLS 证书
    #[arg(long, short = 'k')]
    insecure: bool,
    /// 超时秒数（0 表示不限）
    #[arg(long)]
    timeout: Option<u64>,
    /// 显示响应头
    #[arg(long, short)]
    verbose: bool,
    /// 以 JSON 输出完整响应
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
pub enum CollectionCommand {
    Create { name: Option<String> },
    List,
    Show { id: String },
    Delete { id: String },
    Rename { id: String, name: Option<String> },
}

#[derive(Subcommand)]
pub enum RequestCommand {
    Save {
        spec: PathBuf,
        #[arg(long, short)]
        collection: Option<String>,
        #[arg(long, short)]
        name: Option<String>,
    },
    /// 显示已保存的请求（不含秘密字段）
    Show { id: String },
    Delete { id: String },
    Rename { id: String, name: Option<String> },
}

#[derive(Subcommand)]
pub enum SecretCommand {
    Set { name: String, value: Option<String> },
    Get { name: String },
    Delete { name: String },
    List,
}

struct CliRunner {
    workbench: Workbench,
    prompter: InquirePrompter,
    color: bool,
}

impl CliRunner {
    fn new(config: &Config, color: bool) -> Result<Self> {
        let workbench = Workbench::open(config).context("failed to open stores")?;
        Ok(Self {
            workbench,
            prompter: InquirePrompter,
            color,
        })
    }

    async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Send { spec, output } => {
                let spec = RequestSpec::from_file(&spec)?;
                self.send(&spec, &output).await
            }
            Commands::Run { id, output } => {
                let request = self
                    .workbench
                    .coordinator()
                    .load_request(&id)?
                    .ok_or_else(|| anyhow!("No request with id {}", id))?;
                self.send(&request.spec, &output).await
            }
            Commands::Collection(command) => self.collection(command),
            Commands::Request(command) => self.request(command),
            Commands::Secret(command) => self.secret(command),
            Commands::Check { prune } => self.check(prune),
        }
    }

    fn transport(&self, args: &SendArgs) -> TransportOptions {
        let mut transport = self.workbench.transport().clone();
        if args.insecure {
            transport.strict_ssl = false;
        }
        if let Some(secs) = args.timeout {
            transport.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        transport
    }

    async fn send(&self, spec: &RequestSpec, args: &SendArgs) -> Result<()> {
        let transport = self.transport(args);
        let response = self.workbench.send_with(spec, &transport).await;

        let format = if args.json {
            ResponseFormat::Json
        } else if args.verbose {
            ResponseFormat::Verbose
        } else {
            ResponseFormat::Compact
        };
        let text = ResponseFormatter::new(format)
            .with_color(self.color)
            .format(&response)?;
        println!("{}", text);
        Ok(())
    }

    fn collection(&mut self, command: CollectionCommand) -> Result<()> {
        let coordinator = self.workbench.coordinator_mut();
        match command {
            CollectionCommand::Create { name } => {
                let created = match name {
                    Some(name) => Some(coordinator.create_collection(&name)?),
                    None => flows::create_collection(&mut self.prompter, coordinator)?,
                };
                if let Some(collection) = created {
                    println!("{}", collection.id);
                }
            }
            CollectionCommand::List => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_header(vec!["ID", "Name", "Requests", "Updated"]);
                for collection in coordinator.store().list_collections() {
                    table.add_row(vec![
                        Cell::new(&collection.id),
                        Cell::new(&collection.name),
                        Cell::new(coordinator.store().collection_requests(&collection.id).len()),
                        Cell::new(collection.updated_at.format("%Y-%m-%d %H:%M:%S"))
                            .add_attribute(Attribute::Dim),
                    ]);
                }
                println!("{}", table);
            }
            CollectionCommand::Show { id } => {
                let store = coordinator.store();
                let collection = store
                    .get_collection(&id)
                    .ok_or_else(|| anyhow!("No collection with id {}", id))?;
                println!("{}", collection.name);

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_header(vec!["ID", "Method", "Name", "URL"]);
                for request in store.collection_requests(&id) {
                    table.add_row(vec![
                        Cell::new(&request.id),
                        Cell::new(request.spec.method).fg(Color::Cyan),
                        Cell::new(request.name()),
                        Cell::new(&request.spec.url).add_attribute(Attribute::Dim),
                    ]);
                }
                println!("{}", table);
            }
            CollectionCommand::Delete { id } => {
                if flows::delete_collection(&mut self.prompter, coordinator, &id)? {
                    println!("Deleted collection {}", id);
                }
            }
            CollectionCommand::Rename { id, name } => {
                rename(&mut self.prompter, coordinator, &id, ItemKind::Collection, name)?;
            }
        }
        Ok(())
    }

    fn request(&mut self, command: RequestCommand) -> Result<()> {
        let coordinator = self.workbench.coordinator_mut();
        match command {
            RequestCommand::Save {
                spec,
                collection,
                name,
            } => {
                let spec = RequestSpec::from_file(&spec)?;
                let outcome = flows::save_request(
                    &mut self.prompter,
                    coordinator,
                    &spec,
                    collection.as_deref(),
                    name.as_deref(),
                )?;
                if let Some(outcome) = outcome {
                    println!("{}", outcome.request_id);
                }
            }
            RequestCommand::Show { id } => {
                let request = coordinator
                    .store()
                    .get_request(&id)
                    .ok_or_else(|| anyhow!("No request with id {}", id))?;
                println!("{}", serde_json::to_string_pretty(request)?);
            }
            RequestCommand::Delete { id } => {
                if flows::delete_request(&mut self.prompter, coordinator, &id)? {
                    println!("Deleted request {}", id);
                }
            }
            RequestCommand::Rename { id, name } => {
                rename(&mut self.prompter, coordinator, &id, ItemKind::Request, name)?;
            }
        }
        Ok(())
    }

    fn secret(&mut self, command: SecretCommand) -> Result<()> {
        let vault = self.workbench.coordinator().vault();
        match command {
            SecretCommand::Set { name, value } => {
                let value = match value {
                    Some(value) => value,
                    None => Password::new("Secret value")
                        .without_confirmation()
                        .prompt()
                        .context("no secret value entered")?,
                };
                vault.store_global(&name, &value)?;
            }
            SecretCommand::Get { name } => match vault.get_global(&name)? {
                Some(value) => println!("{}", value),
                None => return Err(anyhow!("No secret named {}", name)),
            },
            SecretCommand::Delete { name } => vault.delete_global(&name)?,
            SecretCommand::List => {
                for name in vault.global_names()? {
                    println!("{}", name);
                }
            }
        }
        Ok(())
    }

    fn check(&mut self, prune: bool) -> Result<()> {
        let coordinator = self.workbench.coordinator_mut();
        let report = coordinator.check_consistency()?;

        for id in &report.missing_credentials {
            println!("missing credentials: {}", id);
        }
        for id in &report.orphaned_credentials {
            println!("orphaned credentials: {}", id);
        }
        if report.is_consistent() {
            println!("Stores are consistent");
        } else if prune {
            let pruned = coordinator.prune_orphans()?;
            println!("Pruned {} orphaned credential(s)", pruned);
        }
        Ok(())
    }
}

fn rename(
    prompter: &mut InquirePrompter,
    coordinator: &mut postcode::PersistenceCoordinator,
    id: &str,
    kind: ItemKind,
    name: Option<String>,
) -> Result<()> {
    let renamed = match name {
        Some(name) => coordinator.rename_item(id, kind, &name)?,
        None => flows::rename_item(prompter, coordinator, id, kind)?,
    };
    if !renamed {
        println!("Nothing renamed");
    }
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut runner = CliRunner::new(&config, !cli.no_color)?;
    runner.run(cli.command).await
}
