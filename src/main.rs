use clap::{Parser, Subcommand};
use quantity_field::codec::{self, DbValue};
use quantity_field::config::{self, CompositeLayout, ConfigFile, FieldSpec};
use quantity_field::convert::RawInput;
use quantity_field::query::{Aggregate, ColumnRef, LookupRhs};
use quantity_field::{numeric, FieldKind, QuantityField};

#[derive(Parser)]
#[command(name = "quantity-field")]
#[command(about = "Convert, encode and query unit-aware quantity columns", long_about = None)]
struct Cli {
    /// Settings file (precision, custom units, optional [field])
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Default unit of the field (overrides [field].default_unit)
    #[arg(short, long, global = true)]
    unit: Option<String>,

    /// Magnitude kind: integer, big_integer or decimal
    #[arg(short, long, global = true)]
    kind: Option<String>,

    /// Log conversions and encoding at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert input (e.g. "10 kg", "2.5", '{"magnitude":1,"units":"g"}') to a quantity
    Convert {
        input: String,

        /// Also show the value in this unit
        #[arg(long)]
        to: Option<String>,
    },

    /// Validate input and print its composite record
    Encode { input: String },

    /// Decode a stored value: "(comparator,magnitude,units)" or an aggregate scalar
    Decode { value: String },

    /// Translate a lookup into a comparator predicate
    Lookup {
        /// Lookup name (exact, gt, gte, lt, lte, range, isnull)
        op: String,

        /// Operand(s); range takes two
        values: Vec<String>,

        /// Column name
        #[arg(long, default_value = "value")]
        column: String,
    },

    /// Render an aggregate, or resolve its scalar result
    Aggregate {
        /// sum, avg, min, max, count, stddev or variance
        function: String,

        /// Scalar returned by the database
        result: Option<String>,

        #[arg(long, default_value = "value")]
        column: String,
    },

    /// List the units known to the registry
    Units {
        /// Only units of the same dimension as this one
        #[arg(long)]
        like: Option<String>,
    },

    /// Print CREATE TYPE statements for the composite types
    Ddl {
        /// per_kind or unified
        #[arg(long, default_value = "per_kind")]
        layout: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load_from_file(path)?,
        None => ConfigFile::default(),
    };
    config::init(file.settings.build_context()?)?;

    match &cli.command {
        Commands::Convert { input, to } => convert_input(&build_field(cli, &file)?, input, to.as_deref()),
        Commands::Encode { input } => encode_input(&build_field(cli, &file)?, input),
        Commands::Decode { value } => decode_value(&build_field(cli, &file)?, value),
        Commands::Lookup { op, values, column } => {
            translate(&build_field(cli, &file)?, op, values, column)
        }
        Commands::Aggregate {
            function,
            result,
            column,
        } => aggregate(&build_field(cli, &file)?, function, result.as_deref(), column),
        Commands::Units { like } => list_units(like.as_deref()),
        Commands::Ddl { layout } => print_ddl(layout),
    }
}

fn build_field(cli: &Cli, file: &ConfigFile) -> Result<QuantityField, Box<dyn std::error::Error>> {
    let mut spec = match (&file.field, &cli.unit) {
        (Some(spec), _) => spec.clone(),
        (None, Some(unit)) => FieldSpec::new(unit, FieldKind::Decimal),
        (None, None) => return Err("a field needs a default unit: pass --unit or a [field] section".into()),
    };
    if let Some(unit) = &cli.unit {
        spec.default_unit = unit.clone();
    }
    if let Some(kind) = &cli.kind {
        spec.kind = parse_kind(kind)?;
    }
    Ok(QuantityField::from_spec(&spec)?)
}

fn parse_kind(kind: &str) -> Result<FieldKind, Box<dyn std::error::Error>> {
    match kind {
        "integer" | "int" => Ok(FieldKind::Integer),
        "big_integer" | "bigint" => Ok(FieldKind::BigInteger),
        "decimal" => Ok(FieldKind::Decimal),
        other => Err(format!("unknown kind '{}'", other).into()),
    }
}

/// Command line input is JSON when it parses as JSON, text otherwise.
fn parse_input(input: &str) -> RawInput {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value) => RawInput::from(value),
        Err(_) => RawInput::from(input),
    }
}

fn convert_input(
    field: &QuantityField,
    input: &str,
    to: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let converted = match field.convert_detailed(&parse_input(input))? {
        Some(converted) => converted,
        None => {
            println!("null");
            return Ok(());
        }
    };
    if let Some(warning) = &converted.warning {
        eprintln!("Warning: {}", warning);
    }

    let quantity = &converted.quantity;
    println!("{}", serde_json::to_string_pretty(quantity)?);
    println!(
        "comparator: {}",
        numeric::to_plain_string(&quantity.to_base(field.config().precision()))
    );
    if let Some(unit) = to {
        println!("{}", field.display_in(quantity, unit)?);
    }
    Ok(())
}

fn encode_input(field: &QuantityField, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let quantity = field.clean(&parse_input(input))?;
    match field.encode(quantity.as_ref())? {
        Some(record) => {
            let type_name = field.config().type_name();
            println!("{}", record.to_text());
            println!("{}", record.to_sql_literal(type_name));
        }
        None => println!("NULL"),
    }
    Ok(())
}

fn decode_value(field: &QuantityField, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let value = match numeric::parse_decimal(value) {
        Some(scalar) => DbValue::Decimal(scalar),
        None if value.trim().eq_ignore_ascii_case("null") => DbValue::Null,
        None => DbValue::Text(value.to_string()),
    };
    match field.decode(&value)? {
        Some(quantity) => println!("{}", field.display(&quantity)),
        None => println!("null"),
    }
    Ok(())
}

fn translate(
    field: &QuantityField,
    op: &str,
    values: &[String],
    column: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let rhs = match (op, values) {
        ("isnull", [flag]) => LookupRhs::Flag(flag.parse::<bool>()?),
        (_, [value]) => LookupRhs::value(parse_input(value)),
        (_, [low, high]) => LookupRhs::range(parse_input(low), parse_input(high)),
        _ => return Err(format!("'{}' takes one or two operands, got {}", op, values.len()).into()),
    };

    let compiled = field.translate_lookup(op, &ColumnRef::new(column), &rhs)?;
    println!("{}", compiled.sql);
    println!("{}", serde_json::to_string(&compiled.params)?);
    Ok(())
}

fn aggregate(
    field: &QuantityField,
    function: &str,
    result: Option<&str>,
    column: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let aggregate: Aggregate = function.parse()?;
    println!("{}", field.aggregate_sql(aggregate, &ColumnRef::new(column)));

    if let Some(result) = result {
        let scalar = numeric::parse_decimal(result)
            .map(DbValue::Decimal)
            .unwrap_or(DbValue::Null);
        match field.resolve_aggregate(aggregate, &scalar)? {
            Some(value) => println!("{}", value),
            None => println!("null"),
        }
    }
    Ok(())
}

fn list_units(like: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = config::context()?.registry();
    let dimension = like.map(|u| registry.dimensionality_of(u)).transpose()?;

    for unit in registry.units() {
        if let Some(dimension) = dimension {
            if unit.dimension != dimension.to_string() {
                continue;
            }
        }
        let symbol = unit.symbol.as_deref().unwrap_or("-");
        println!("{:<20} {:<6} {:<30} {}", unit.name, symbol, unit.dimension, unit.factor);
    }
    Ok(())
}

fn print_ddl(layout: &str) -> Result<(), Box<dyn std::error::Error>> {
    let layout = match layout {
        "per_kind" => CompositeLayout::PerKind,
        "unified" => CompositeLayout::Unified,
        other => return Err(format!("unknown layout '{}'", other).into()),
    };
    for statement in codec::create_all_types_sql(layout) {
        println!("{}", statement);
    }
    Ok(())
}
