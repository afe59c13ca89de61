use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use requisition_tracker::{
    auth::{
        hash_password, Actor, ApproverDirectory, Authenticator, Identity, Role, StaticAuthenticator,
    },
    commands::{
        AddLineItemCommand, ApproveStepCommand, AttachDocumentCommand, Command, CommandContext,
        RecordInvoiceCommand, RecordPurchaseOrderCommand, RejectStepCommand,
        RemoveAttachmentCommand, RemoveLineItemCommand, SubmitRequisitionCommand,
        UpdateDetailsCommand, UpdateLineItemCommand,
    },
    config::{self, AppConfig},
    metrics,
    models::{AttachmentCategory, Requisition, StepStatus, APPROVAL_CHAIN},
    services::{
        attachments::{by_category, format_size},
        dashboard::summarize,
        ledger::{LineItemChanges, NewLineItem},
    },
    store::{FileStorage, RequisitionStore},
};
use rust_decimal::Decimal;
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut context = CliContext::initialize()?;

    match cli.command {
        Commands::Login(args) => handle_login(&mut context, args, cli.json)?,
        Commands::Logout => {
            context.store.sign_out().context("failed to clear session")?;
            println!("Signed out");
        }
        Commands::Whoami => handle_whoami(&context, cli.json)?,
        Commands::Approvers => handle_approvers(&context, cli.json)?,
        Commands::Show => handle_show(&context, cli.json)?,
        Commands::Summary => handle_summary(&context, cli.json)?,
        Commands::Details(args) => handle_details(&mut context, args, cli.json).await?,
        Commands::Item(command) => handle_item_command(&mut context, command, cli.json).await?,
        Commands::Submit => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            let requisition = SubmitRequisitionCommand
                .execute(&mut ctx)
                .await
                .context("failed to submit requisition")?;
            output(&requisition, cli.json, || {
                println!("Requisition {} submitted for approval", requisition.id)
            })?;
        }
        Commands::Approve(args) => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            let decision = ApproveStepCommand {
                comments: args.comments,
            }
            .execute(&mut ctx)
            .await
            .context("failed to approve")?;
            output(&decision, cli.json, || {
                println!("{:?} (status {})", decision.transition, decision.status)
            })?;
        }
        Commands::Reject(args) => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            let decision = RejectStepCommand {
                comments: args.comments,
            }
            .execute(&mut ctx)
            .await
            .context("failed to reject")?;
            output(&decision, cli.json, || {
                println!("{:?} (status {})", decision.transition, decision.status)
            })?;
        }
        Commands::Attach(args) => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            let attachment = AttachDocumentCommand {
                path: args.path,
                category: args.category,
            }
            .execute(&mut ctx)
            .await
            .context("failed to attach document")?;
            output(&attachment, cli.json, || {
                println!(
                    "Attached {} ({}) as {}",
                    attachment.file_name,
                    format_size(attachment.file_size),
                    attachment.id
                )
            })?;
        }
        Commands::Detach(args) => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            RemoveAttachmentCommand { id: args.id }
                .execute(&mut ctx)
                .await
                .context("failed to remove document")?;
            println!("Document removed");
        }
        Commands::Documents(args) => handle_documents(&context, args, cli.json)?,
        Commands::Po(args) => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            let requisition = RecordPurchaseOrderCommand {
                po_number: args.number,
                issued_at: args.date,
            }
            .execute(&mut ctx)
            .await
            .context("failed to record purchase order")?;
            output(&requisition, cli.json, || render_requisition(&requisition))?;
        }
        Commands::Invoice(args) => {
            let actor = context.actor()?;
            let mut ctx = context.command_context(&actor);
            let requisition = RecordInvoiceCommand {
                invoice_number: args.number,
                received_at: args.date,
            }
            .execute(&mut ctx)
            .await
            .context("failed to record invoice")?;
            output(&requisition, cli.json, || render_requisition(&requisition))?;
        }
        Commands::Export(args) => {
            let text = context.store.export()?;
            let path = args
                .output
                .unwrap_or_else(|| PathBuf::from(context.store.export_file_name()));
            fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Commands::Import(args) => {
            let text = fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let requisition = context.store.import(&text)?.clone();
            output(&requisition, cli.json, || {
                println!("Imported requisition {}", requisition.id)
            })?;
        }
        Commands::Reset => {
            let requisition = context.store.reset()?.clone();
            println!("Started new requisition {}", requisition.id);
        }
        Commands::HashPassword(args) => println!("{}", hash_password(&args.password)?),
        Commands::Metrics => print!("{}", metrics::render()?),
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "requisition-cli",
    about = "Track a procurement requisition through its approval chain",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the identity
    Login(LoginArgs),
    Logout,
    Whoami,
    /// List who holds each approval role
    Approvers,
    /// Print the current requisition
    Show,
    /// Approval progress from the signed-in identity's point of view
    Summary,
    /// Edit title, requester, department, justification or request date
    Details(DetailsArgs),
    #[command(subcommand)]
    Item(ItemCommands),
    Submit,
    Approve(DecisionArgs),
    Reject(DecisionArgs),
    Attach(AttachArgs),
    Detach(IdArgs),
    Documents(DocumentsArgs),
    /// Record the purchase order issued for an approved requisition
    Po(NumberArgs),
    /// Record the invoice received for an approved requisition
    Invoice(NumberArgs),
    Export(ExportArgs),
    Import(ImportArgs),
    /// Discard the current requisition and start a new draft
    Reset,
    /// Print an Argon2 hash for use in the credential list
    HashPassword(HashPasswordArgs),
    /// Print workflow counters in Prometheus text format
    Metrics,
}

#[derive(Subcommand)]
enum ItemCommands {
    Add(ItemAddArgs),
    Update(ItemUpdateArgs),
    Remove(IdArgs),
    Show(IdArgs),
    List,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long, help = "Email address for the account")]
    email: String,
    #[arg(long, help = "Password for the account")]
    password: String,
}

#[derive(Args)]
struct DetailsArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    requester: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    justification: Option<String>,
    #[arg(long, help = "Request date in RFC 3339 format")]
    date: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct ItemAddArgs {
    #[arg(long)]
    description: String,
    #[arg(long)]
    quantity: u32,
    #[arg(long, help = "Unit price, e.g. 125.50")]
    unit_price: Decimal,
}

#[derive(Args)]
struct ItemUpdateArgs {
    id: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    quantity: Option<u32>,
    #[arg(long)]
    unit_price: Option<Decimal>,
}

#[derive(Args)]
struct IdArgs {
    id: String,
}

#[derive(Args)]
struct DecisionArgs {
    #[arg(long, help = "Optional comment recorded on the step")]
    comments: Option<String>,
}

#[derive(Args)]
struct AttachArgs {
    path: PathBuf,
    #[arg(long, default_value = "Supporting", help = "PO, Invoice, Supporting or Other")]
    category: AttachmentCategory,
}

#[derive(Args)]
struct DocumentsArgs {
    #[arg(long, help = "Only list documents of this category")]
    category: Option<AttachmentCategory>,
}

#[derive(Args)]
struct NumberArgs {
    number: String,
    #[arg(long, help = "Date in RFC 3339 format; defaults to now")]
    date: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, help = "Output path; defaults to requisition-<id>.json")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ImportArgs {
    file: PathBuf,
}

#[derive(Args)]
struct HashPasswordArgs {
    password: String,
}

struct CliContext {
    config: AppConfig,
    store: RequisitionStore<FileStorage>,
    directory: ApproverDirectory,
    authenticator: StaticAuthenticator,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let store = RequisitionStore::open(FileStorage::new(config.storage_path()));
        let directory = ApproverDirectory::from_table(&config.approvers);
        let authenticator = StaticAuthenticator::from_config(&config);

        Ok(Self {
            config,
            store,
            directory,
            authenticator,
        })
    }

    fn identity(&self) -> Result<Identity> {
        self.store
            .current_identity()?
            .ok_or_else(|| anyhow!("not signed in; run `requisition-cli login` first"))
    }

    fn actor(&self) -> Result<Actor> {
        Ok(Actor::resolve(&self.identity()?, &self.directory))
    }

    fn command_context<'a>(&'a mut self, actor: &'a Actor) -> CommandContext<'a, FileStorage> {
        CommandContext::new(&mut self.store, actor)
            .with_attachment_limit(self.config.max_attachment_bytes)
    }
}

fn handle_login(context: &mut CliContext, args: LoginArgs, json: bool) -> Result<()> {
    let identity = context
        .authenticator
        .authenticate(&args.email, &args.password)
        .context("failed to authenticate")?;
    context.store.sign_in(&identity).context("failed to save session")?;
    let actor = Actor::resolve(&identity, &context.directory);
    output(&actor, json, || {
        println!("Signed in as {} <{}> ({})", actor.name, actor.email, actor.role)
    })
}

fn handle_whoami(context: &CliContext, json: bool) -> Result<()> {
    let actor = context.actor()?;
    output(&actor, json, || {
        println!("{} <{}> ({})", actor.name, actor.email, actor.role)
    })
}

#[derive(Serialize)]
struct RoleMembers {
    role: Role,
    members: Vec<String>,
}

fn handle_approvers(context: &CliContext, json: bool) -> Result<()> {
    let roles: Vec<RoleMembers> = APPROVAL_CHAIN
        .iter()
        .map(|stage| Role::from(*stage))
        .chain(std::iter::once(Role::Admin))
        .map(|role| RoleMembers {
            role,
            members: context.directory.members(role),
        })
        .collect();
    output(&roles, json, || {
        for entry in &roles {
            let members = if entry.members.is_empty() {
                "(none)".to_string()
            } else {
                entry.members.join(", ")
            };
            println!("{:<8} {}", entry.role.to_string(), members);
        }
    })
}

fn handle_show(context: &CliContext, json: bool) -> Result<()> {
    let requisition = context.store.get();
    output(requisition, json, || render_requisition(requisition))
}

fn handle_summary(context: &CliContext, json: bool) -> Result<()> {
    let actor = context.actor()?;
    let summary = summarize(context.store.get(), &actor);
    output(&summary, json, || {
        println!(
            "Status {} • {}/{} approved",
            summary.status, summary.approved_count, summary.total_steps
        );
        if let Some(stage) = summary.current_stage {
            println!("Waiting on {}", stage);
        }
        if summary.needs_my_approval {
            println!("Your approval is required");
        }
    })
}

async fn handle_details(context: &mut CliContext, args: DetailsArgs, json: bool) -> Result<()> {
    let actor = context.actor()?;
    let mut ctx = context.command_context(&actor);
    let requisition = UpdateDetailsCommand {
        title: args.title,
        requester: args.requester,
        department: args.department,
        justification: args.justification,
        date_requested: args.date,
    }
    .execute(&mut ctx)
    .await
    .context("failed to update details")?;
    output(&requisition, json, || render_requisition(&requisition))
}

async fn handle_item_command(
    context: &mut CliContext,
    command: ItemCommands,
    json: bool,
) -> Result<()> {
    let currency = context.config.currency.clone();
    match &command {
        ItemCommands::List => {
            let requisition = context.store.get();
            return output(&requisition.line_items, json, || {
                render_line_items(requisition, &currency)
            });
        }
        ItemCommands::Show(args) => {
            let item = context
                .store
                .get()
                .line_item(&args.id)
                .ok_or_else(|| anyhow!("line item {} not found", args.id))?;
            return output(item, json, || {
                println!(
                    "{} • {} x {} @ {} (total {} {:.2})",
                    item.id,
                    item.quantity,
                    item.description,
                    item.unit_price,
                    currency,
                    item.total_price()
                )
            });
        }
        _ => {}
    }

    let actor = context.actor()?;
    let mut ctx = context.command_context(&actor);
    match command {
        ItemCommands::Add(args) => {
            let added = AddLineItemCommand {
                item: NewLineItem {
                    description: args.description,
                    quantity: args.quantity,
                    unit_price: args.unit_price,
                },
            }
            .execute(&mut ctx)
            .await
            .context("failed to add line item")?;
            output(&added, json, || {
                println!(
                    "Added {} • total now {} {:.2}",
                    added.item.id, currency, added.total_amount
                )
            })
        }
        ItemCommands::Update(args) => {
            let updated = UpdateLineItemCommand {
                id: args.id,
                changes: LineItemChanges {
                    description: args.description,
                    quantity: args.quantity,
                    unit_price: args.unit_price,
                },
            }
            .execute(&mut ctx)
            .await
            .context("failed to update line item")?;
            output(&updated, json, || {
                println!("Updated • total now {} {:.2}", currency, updated.total_amount)
            })
        }
        ItemCommands::Remove(args) => {
            let total = RemoveLineItemCommand { id: args.id }
                .execute(&mut ctx)
                .await
                .context("failed to remove line item")?;
            output(&total, json, || {
                println!("Removed • total now {} {:.2}", currency, total)
            })
        }
        ItemCommands::List | ItemCommands::Show(_) => Ok(()),
    }
}

fn handle_documents(context: &CliContext, args: DocumentsArgs, json: bool) -> Result<()> {
    let requisition = context.store.get();
    let documents: Vec<_> = match args.category {
        Some(category) => by_category(requisition, category),
        None => requisition.attachments.iter().collect(),
    };
    output(&documents, json, || {
        if documents.is_empty() {
            println!("No documents attached");
        }
        for doc in &documents {
            println!(
                "- {} • {} • {} • {} • uploaded by {}",
                doc.id,
                doc.file_name,
                doc.category,
                format_size(doc.file_size),
                doc.uploaded_by
            );
        }
    })
}

fn output<T: Serialize + ?Sized>(value: &T, json: bool, render: impl FnOnce()) -> Result<()> {
    if json {
        print_json(value)
    } else {
        render();
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_requisition(requisition: &Requisition) {
    println!(
        "Requisition {} • {} • status {}",
        requisition.id,
        if requisition.title.is_empty() {
            "(untitled)"
        } else {
            requisition.title.as_str()
        },
        requisition.approval_status
    );
    println!(
        "  Requester {} • department {} • requested {}",
        requisition.requester,
        requisition.department,
        requisition.date_requested.format("%Y-%m-%d")
    );
    println!(
        "  {} line item(s) • total {:.2}",
        requisition.line_items.len(),
        requisition.total_amount
    );
    for step in &requisition.approval_steps {
        let marker = match step.status {
            StepStatus::Approved => "✓",
            StepStatus::Rejected => "✗",
            StepStatus::Pending if Some(step.order) == requisition.current_approval_step => "→",
            StepStatus::Pending => " ",
        };
        println!(
            "  {} {}. {} {}{}",
            marker,
            step.order,
            step.approver_role,
            step.status,
            step.approver_name
                .as_deref()
                .map(|name| format!(" by {}", name))
                .unwrap_or_default()
        );
    }
    if let Some(po) = &requisition.po_number {
        println!("  PO {}", po);
    }
    if let Some(invoice) = &requisition.invoice_number {
        println!("  Invoice {}", invoice);
    }
}

fn render_line_items(requisition: &Requisition, currency: &str) {
    for item in &requisition.line_items {
        println!(
            "- {} • {} x {} @ {} (total {:.2})",
            item.id,
            item.quantity,
            item.description,
            item.unit_price,
            item.total_price()
        );
    }
    println!("Total {} {:.2}", currency, requisition.total_amount);
}
