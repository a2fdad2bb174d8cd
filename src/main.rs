use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use pharmacy::client::{ClientInput, ClientUpdate};
use pharmacy::config::{config_dir, load_config, CONFIG_TEMPLATE};
use pharmacy::error::{ErrorKind, PharmacyError, Result};
use pharmacy::format::{format_amount, format_datetime, format_grouped_int, format_optional_date};
use pharmacy::report::{
    fidelity_title, FidelityFilter, GeneratedReport, InventoryFilter, ReportOptions,
    ReportRequest, ReportService, SortOrder, INVENTORY_TITLE,
};
use pharmacy::store::{CatalogRepository, ClientRepository, NewMedicine, SaleRepository};
use pharmacy::{Config, Database, IdCodec};

#[derive(Parser)]
#[command(name = "pharmacy")]
#[command(
    version,
    about = "Pharmacy back-office: clients, sales, catalog and reports",
    long_about = None
)]
struct Cli {
    /// Path to config directory (default: ~/.pharmacy or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and database
    Init,

    /// Show configuration and record counts
    Status,

    /// Manage clients
    #[command(subcommand)]
    Client(ClientCommand),

    /// Record sales
    #[command(subcommand)]
    Sale(SaleCommand),

    /// Manage the medicine catalog
    #[command(subcommand)]
    Medicine(MedicineCommand),

    /// List medicine categories
    Categories,

    /// Encode or decode record IDs
    #[command(subcommand)]
    Id(IdCommand),

    /// Export reports as PDF or Excel
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Register a new client
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Tax ID (7-12 digits, optional -d check digit)
        #[arg(long)]
        nit: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// List active clients
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a client by its encrypted ID
    Show { id: String },

    /// Change client fields; pass an empty string to clear NIT or email
    Edit {
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        nit: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Soft-delete a client
    Delete { id: String },
}

#[derive(Subcommand)]
enum SaleCommand {
    /// Record a sale for a client
    Add {
        /// Encrypted client ID
        #[arg(long)]
        client: String,
        #[arg(long)]
        amount: Decimal,
        /// Sale date (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS", default: now)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum MedicineCommand {
    /// Add a medicine; category and presentation are created if missing
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        presentation: String,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        description: Option<String>,
        /// Register the medicine as inactive
        #[arg(long)]
        inactive: bool,
    },
}

#[derive(Subcommand)]
enum IdCommand {
    /// Encrypt a numeric ID
    Encode { id: i32 },
    /// Decrypt an encrypted ID
    Decode { token: String },
}

#[derive(Args)]
struct OutputArgs {
    /// Output format: pdf or xlsx
    #[arg(short, long, default_value = "pdf")]
    format: String,

    /// Output file (default: <output_dir>/<generated name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the rows as a table instead of writing a file
    #[arg(long)]
    preview: bool,

    /// Name shown as "Generated by" (default: config or "System")
    #[arg(long = "as", value_name = "NAME")]
    generated_by: Option<String>,

    /// Open the generated file with the system default viewer
    #[arg(long)]
    open: bool,
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Client fidelity: purchases per client over a period
    Fidelity {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day of the period, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Only clients who spent at least this much
        #[arg(long, default_value = "0")]
        min_total: Decimal,
        /// Only the N biggest spenders, highest first
        #[arg(long, value_name = "N")]
        top: Option<u32>,
        /// Sort by: name, total, count, last-sale
        #[arg(long, default_value = "name")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "asc")]
        order: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Medicines by category with stock levels
    Inventory {
        /// Restrict to one category (by name)
        #[arg(long)]
        category: Option<String>,
        /// Only medicines at or below the low-stock threshold
        #[arg(long)]
        low_stock: bool,
        /// Low-stock threshold (default: config)
        #[arg(long)]
        threshold: Option<i64>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        /// Sort within each category by: name, stock, price, value
        #[arg(long, default_value = "name")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "asc")]
        order: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let env = env_logger::Env::default().default_filter_or("warn");
    let mut logger = env_logger::Builder::from_env(env);
    if cli.verbose {
        logger.filter_level(LevelFilter::Info);
    }
    logger.init();

    if let Err(e) = run(cli) {
        if e.kind() == ErrorKind::Infrastructure {
            log::error!("{e}");
        }
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    // Every command except `init` needs an existing config directory.
    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&Context::load(cfg_dir)?),
        Commands::Client(cmd) => cmd_client(&Context::load(cfg_dir)?, cmd),
        Commands::Sale(SaleCommand::Add {
            client,
            amount,
            date,
        }) => cmd_sale_add(&Context::load(cfg_dir)?, &client, amount, date.as_deref()),
        Commands::Medicine(MedicineCommand::Add {
            name,
            category,
            presentation,
            stock,
            price,
            description,
            inactive,
        }) => cmd_medicine_add(
            &Context::load(cfg_dir)?,
            NewMedicine {
                name,
                description,
                category,
                presentation,
                stock_total: stock,
                unit_price: price,
                active: !inactive,
            },
        ),
        Commands::Categories => cmd_categories(&Context::load(cfg_dir)?),
        Commands::Id(cmd) => cmd_id(&Context::load(cfg_dir)?, cmd),
        Commands::Report(cmd) => cmd_report(&Context::load(cfg_dir)?, cmd),
    }
}

/// Loaded configuration plus the handles every command needs.
struct Context {
    cfg_dir: PathBuf,
    config: Config,
    db: Database,
    ids: IdCodec,
}

impl Context {
    fn load(cfg_dir: PathBuf) -> Result<Self> {
        let config = load_config(&cfg_dir)?;
        let db = Database::open(config.database_path(&cfg_dir))?;
        let ids = config.id_codec()?;
        Ok(Self {
            cfg_dir,
            config,
            db,
            ids,
        })
    }

    fn client_id(&self, token: &str) -> Result<i32> {
        self.ids.decode(token)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| PharmacyError::InvalidArgument {
        field,
        value: raw.to_string(),
    })
}

/// Accepts a bare date (midnight) or a full timestamp.
fn parse_sale_date(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(at);
    }
    parse_date("date", raw).map(|d| d.and_time(chrono::NaiveTime::MIN))
}

/// Initialize config directory, output directory and database
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(PharmacyError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    let config = load_config(cfg_dir)?;
    fs::create_dir_all(config.output_dir(cfg_dir))?;
    let db = Database::open(config.database_path(cfg_dir))?;

    println!("Initialized pharmacy config at: {}", cfg_dir.display());
    println!("Database:  {}", db.path().display());
    println!();
    println!("Next steps:");
    println!("  1. Edit your details: $EDITOR {}/config.toml", cfg_dir.display());
    println!("  2. Register clients:  pharmacy client add --first-name <NAME> --last-name <NAME>");
    println!("  3. Export a report:   pharmacy report fidelity --from <DATE> --to <DATE>");

    Ok(())
}

fn cmd_status(ctx: &Context) -> Result<()> {
    let clients = ClientRepository::new(ctx.db.clone()).count()?;
    let sales = SaleRepository::new(ctx.db.clone()).count()?;
    let catalog = CatalogRepository::new(ctx.db.clone());

    println!("Pharmacy Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", ctx.cfg_dir.display());
    println!("Pharmacy:         {}", ctx.config.pharmacy.name);
    println!("Database:         {}", ctx.db.path().display());
    println!("Output directory: {}", ctx.config.output_dir(&ctx.cfg_dir).display());
    println!("Clients:          {}", format_grouped_int(clients));
    println!("Sales:            {}", format_grouped_int(sales));
    println!("Categories:       {}", catalog.categories()?.len());
    println!("Medicines:        {}", format_grouped_int(catalog.medicine_count()?));

    Ok(())
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "NIT")]
    nit: String,
    #[tabled(rename = "EMAIL")]
    email: String,
}

#[derive(Serialize)]
struct ClientJson<'a> {
    id: String,
    first_name: &'a str,
    last_name: &'a str,
    nit: Option<&'a str>,
    email: Option<&'a str>,
    created_at: String,
    updated_at: String,
}

fn cmd_client(ctx: &Context, cmd: ClientCommand) -> Result<()> {
    let repo = ClientRepository::new(ctx.db.clone());

    match cmd {
        ClientCommand::Add {
            first_name,
            last_name,
            nit,
            email,
        } => {
            let client = repo.create(
                &ClientInput {
                    first_name,
                    last_name,
                    nit,
                    email,
                },
                now(),
            )?;
            println!("Added client {}", client.full_name());
            println!("  ID: {}", ctx.ids.encode(client.id));
        }
        ClientCommand::List { json } => {
            let clients = repo.list()?;
            if json {
                let out: Vec<ClientJson> = clients
                    .iter()
                    .map(|c| ClientJson {
                        id: ctx.ids.encode(c.id),
                        first_name: &c.first_name,
                        last_name: &c.last_name,
                        nit: c.nit.as_deref(),
                        email: c.email.as_deref(),
                        created_at: format_datetime(c.created_at),
                        updated_at: format_datetime(c.updated_at),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            if clients.is_empty() {
                println!("No clients registered.");
                println!("Add one: pharmacy client add --first-name <NAME> --last-name <NAME>");
                return Ok(());
            }

            let rows: Vec<ClientRow> = clients
                .iter()
                .map(|c| ClientRow {
                    id: ctx.ids.encode(c.id),
                    name: c.full_name(),
                    nit: c.nit.clone().unwrap_or_default(),
                    email: c.email.clone().unwrap_or_default(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!();
            println!("Total: {} clients", clients.len());
        }
        ClientCommand::Show { id } => {
            let client = repo
                .get(ctx.client_id(&id)?)?
                .ok_or(PharmacyError::NotFound { entity: "Client" })?;
            println!("{}", client.full_name());
            println!("{}", "-".repeat(50));
            println!("ID:       {}", ctx.ids.encode(client.id));
            println!("NIT:      {}", client.nit.as_deref().unwrap_or("-"));
            println!("Email:    {}", client.email.as_deref().unwrap_or("-"));
            println!("Created:  {}", format_datetime(client.created_at));
            println!("Updated:  {}", format_datetime(client.updated_at));
        }
        ClientCommand::Edit {
            id,
            first_name,
            last_name,
            nit,
            email,
        } => {
            let update = ClientUpdate {
                first_name,
                last_name,
                nit,
                email,
            };
            if update.is_empty() {
                return Err(PharmacyError::Validation(vec![
                    "Nothing to update; pass at least one field".to_string(),
                ]));
            }
            let client = repo.update(ctx.client_id(&id)?, &update, now())?;
            println!("Updated client {}", client.full_name());
        }
        ClientCommand::Delete { id } => {
            repo.soft_delete(ctx.client_id(&id)?, now())?;
            println!("Deleted client {id}");
        }
    }

    Ok(())
}

fn cmd_sale_add(ctx: &Context, client: &str, amount: Decimal, date: Option<&str>) -> Result<()> {
    let client_id = ctx.client_id(client)?;
    let sale_date = match date {
        Some(raw) => parse_sale_date(raw)?,
        None => now(),
    };
    SaleRepository::new(ctx.db.clone()).record(client_id, amount, sale_date)?;

    println!(
        "Recorded sale of {} {} on {}",
        ctx.config.pharmacy.currency_symbol,
        format_amount(amount),
        format_datetime(sale_date)
    );
    Ok(())
}

fn cmd_medicine_add(ctx: &Context, medicine: NewMedicine) -> Result<()> {
    CatalogRepository::new(ctx.db.clone()).add_medicine(&medicine)?;
    println!(
        "Added {} ({}) to {}",
        medicine.name.trim(),
        medicine.presentation.trim(),
        medicine.category.trim()
    );
    Ok(())
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "CATEGORY")]
    name: String,
    #[tabled(rename = "MEDICINES")]
    medicines: i64,
}

fn cmd_categories(ctx: &Context) -> Result<()> {
    let categories = CatalogRepository::new(ctx.db.clone()).categories()?;
    if categories.is_empty() {
        println!("No categories yet. They are created by 'pharmacy medicine add'.");
        return Ok(());
    }
    let rows: Vec<CategoryRow> = categories
        .into_iter()
        .map(|c| CategoryRow {
            name: c.name,
            medicines: c.medicine_count,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

fn cmd_id(ctx: &Context, cmd: IdCommand) -> Result<()> {
    match cmd {
        IdCommand::Encode { id } => println!("{}", ctx.ids.encode(id)),
        IdCommand::Decode { token } => println!("{}", ctx.ids.decode(&token)?),
    }
    Ok(())
}

#[derive(Tabled)]
struct FidelityPreviewRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "CLIENT")]
    name: String,
    #[tabled(rename = "NIT")]
    nit: String,
    #[tabled(rename = "PURCHASES")]
    purchases: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "AVG")]
    average: String,
    #[tabled(rename = "LAST")]
    last: String,
}

#[derive(Tabled)]
struct InventoryPreviewRow {
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "MEDICINE")]
    name: String,
    #[tabled(rename = "PRESENTATION")]
    presentation: String,
    #[tabled(rename = "STOCK")]
    stock: String,
    #[tabled(rename = "LEVEL")]
    level: String,
    #[tabled(rename = "PRICE")]
    price: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

fn cmd_report(ctx: &Context, cmd: ReportCommand) -> Result<()> {
    let service = ReportService::with_default_renderers(
        ctx.db.clone(),
        ReportOptions::from_config(&ctx.config),
    );

    match cmd {
        ReportCommand::Fidelity {
            from,
            to,
            min_total,
            top,
            sort,
            order,
            output,
        } => {
            let filter = FidelityFilter {
                min_total,
                top_n: top,
                sort: sort.parse()?,
                order: order.parse()?,
                ..FidelityFilter::new(parse_date("from", &from)?, parse_date("to", &to)?)
            };
            let request = report_request(ctx, &output);

            if output.preview {
                let rows = service.fidelity_rows(&filter, &request)?;
                println!("{}", fidelity_title(&filter));
                let preview: Vec<FidelityPreviewRow> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, r)| FidelityPreviewRow {
                        index: i + 1,
                        name: r.full_name.clone(),
                        nit: r.nit.clone().unwrap_or_default(),
                        purchases: format_grouped_int(r.sales_count),
                        total: format_amount(r.total_spent),
                        average: format_amount(r.avg_ticket),
                        last: format_optional_date(r.last_sale),
                    })
                    .collect();
                println!("{}", Table::new(preview).with(Style::rounded()));
                println!("{} clients", rows.len());
                return Ok(());
            }

            let report = service.generate_fidelity(&filter, &request, output.format.parse()?)?;
            write_report(ctx, &report, &output)
        }
        ReportCommand::Inventory {
            category,
            low_stock,
            threshold,
            min_price,
            max_price,
            sort,
            order,
            output,
        } => {
            let category_id = match category {
                Some(name) => Some(
                    CatalogRepository::new(ctx.db.clone())
                        .find_category(&name)?
                        .ok_or(PharmacyError::NotFound { entity: "Category" })?
                        .id,
                ),
                None => None,
            };
            let filter = InventoryFilter {
                category_id,
                only_low_stock: low_stock,
                low_stock_threshold: threshold.unwrap_or(ctx.config.reports.low_stock_threshold),
                min_price,
                max_price,
                sort: sort.parse()?,
                order: order.parse::<SortOrder>()?,
            };
            let request = report_request(ctx, &output);

            if output.preview {
                let rows = service.inventory_rows(&filter)?;
                println!("{INVENTORY_TITLE}");
                let preview: Vec<InventoryPreviewRow> = rows
                    .iter()
                    .map(|r| InventoryPreviewRow {
                        category: r.category_name.clone(),
                        name: r.medicine_name.clone(),
                        presentation: r.presentation_name.clone(),
                        stock: format_grouped_int(r.stock_total),
                        level: r.stock_level().label().to_string(),
                        price: format_amount(r.unit_price),
                        value: format_amount(r.total_value()),
                    })
                    .collect();
                println!("{}", Table::new(preview).with(Style::rounded()));
                println!("{} medicines", rows.len());
                return Ok(());
            }

            let report = service.generate_inventory(&filter, &request, output.format.parse()?)?;
            write_report(ctx, &report, &output)
        }
    }
}

fn report_request(ctx: &Context, output: &OutputArgs) -> ReportRequest {
    let generated_by = output
        .generated_by
        .clone()
        .or_else(|| ctx.config.reports.generated_by.clone())
        .unwrap_or_else(|| "System".to_string());
    ReportRequest::new(generated_by, now()).with_logo(ctx.config.logo_path(&ctx.cfg_dir))
}

fn write_report(ctx: &Context, report: &GeneratedReport, output: &OutputArgs) -> Result<()> {
    let path = match &output.output {
        Some(path) => path.clone(),
        None => {
            let dir = ctx.config.output_dir(&ctx.cfg_dir);
            fs::create_dir_all(&dir)?;
            dir.join(&report.file_name)
        }
    };
    fs::write(&path, &report.bytes)?;

    println!("{}", report.title);
    println!("  Rows:  {}", report.rows);
    println!("  Type:  {}", report.mime_type);
    println!("  Saved: {}", path.display());

    if output.open {
        open_path(&path)?;
    }
    Ok(())
}

fn open_path(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }
    Ok(())
}
