pub mod actions;
pub mod config;

use clap::{Arg, ArgMatches, Command};

/// Parse a number given in decimal or with a `0x` prefix.
pub fn parse_number(value: &str) -> Result<u32, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid number '{value}': {e}"))
}

fn address_args() -> [Arg; 4] {
    [
        Arg::new("idal")
            .long("idal")
            .help("Device selector (8 bit)")
            .value_name("IDAL")
            .required(true)
            .value_parser(parse_number),
        Arg::new("idb")
            .long("idb")
            .help("Device identifier (24 bit)")
            .value_name("IDB")
            .required(true)
            .value_parser(parse_number),
        Arg::new("tab")
            .long("tab")
            .help("Table number")
            .value_name("TAB")
            .required(true)
            .value_parser(parse_number),
        Arg::new("var")
            .long("var")
            .help("Variable number")
            .value_name("VAR")
            .required(true)
            .value_parser(parse_number),
    ]
}

fn connection_args() -> [Arg; 5] {
    [
        Arg::new("tcp")
            .long("tcp")
            .help("Modbus TCP endpoint (host:port)")
            .value_name("ADDR")
            .conflicts_with("port")
            .required_unless_present("port"),
        Arg::new("port")
            .long("port")
            .short('p')
            .help("Serial port for Modbus RTU")
            .value_name("PORT"),
        Arg::new("baud-rate")
            .long("baud-rate")
            .help("Serial port baud rate")
            .value_name("BAUD")
            .default_value("9600")
            .value_parser(clap::value_parser!(u32)),
        Arg::new("unit-id")
            .long("unit-id")
            .help("Modbus unit (slave) id of the Mastervolt interface")
            .value_name("ID")
            .default_value("1")
            .value_parser(clap::value_parser!(u8)),
        Arg::new("timeout-ms")
            .long("timeout-ms")
            .help("Transaction timeout in milliseconds")
            .value_name("MS")
            .default_value("3000")
            .value_parser(clap::value_parser!(u64)),
    ]
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .help("Configuration file (.toml or .json)")
        .value_name("FILE")
        .required(true)
}

/// Build the command line interface.
pub fn build_cli() -> Command {
    Command::new("mastervolt")
        .about("Read and write Mastervolt device variables over Modbus")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Output results in JSON format")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(Command::new("list-ports").about("List all available serial ports and exit"))
        .subcommand(
            Command::new("read")
                .about("Read one variable and print its value")
                .args(address_args())
                .args(connection_args()),
        )
        .subcommand(
            Command::new("write")
                .about("Write a value to one variable")
                .args(address_args())
                .arg(
                    Arg::new("value")
                        .long("value")
                        .help("Value to write")
                        .value_name("VALUE")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f32)),
                )
                .args(connection_args()),
        )
        .subcommand(
            Command::new("run")
                .about("Poll every read-mode variable of a configuration (JSONL output with --json)")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("send")
                .about("Send a command to a configured variable")
                .arg(config_arg())
                .arg(
                    Arg::new("target")
                        .long("target")
                        .short('t')
                        .help("Name of the configured variable")
                        .value_name("NAME")
                        .required(true),
                )
                .arg(
                    Arg::new("value")
                        .long("value")
                        .help("Value to write (defaults to the variable's configured value)")
                        .value_name("VALUE")
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f32)),
                ),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_cli().get_matches()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("66051"), Ok(66051));
        assert_eq!(parse_number("0x010203"), Ok(0x010203));
        assert_eq!(parse_number("0XFF"), Ok(0xFF));
        assert!(parse_number("0xZZ").is_err());
        assert!(parse_number("-1").is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_read_requires_endpoint() {
        let result = build_cli().try_get_matches_from([
            "mastervolt", "read", "--idal", "5", "--idb", "0x010203", "--tab", "16", "--var",
            "32",
        ]);
        assert!(result.is_err());

        let matches = build_cli()
            .try_get_matches_from([
                "mastervolt", "read", "--idal", "5", "--idb", "0x010203", "--tab", "16",
                "--var", "32", "--tcp", "127.0.0.1:502",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<u32>("idb"), Some(&0x010203));
        assert_eq!(sub.get_one::<u8>("unit-id"), Some(&1));
    }

    #[test]
    fn test_write_accepts_negative_values() {
        let matches = build_cli()
            .try_get_matches_from([
                "mastervolt", "write", "--idal", "5", "--idb", "1", "--tab", "2", "--var", "3",
                "--value", "-12.5", "--port", "/dev/ttyUSB0",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<f32>("value"), Some(&-12.5));
    }
}
