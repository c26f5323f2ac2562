use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

pub const VPNCONF_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const VPNCONF_BEFORE_HELP: &str = concat!(
    "vpnconf ",
    env!("CARGO_PKG_VERSION"),
    " – VPN configuration profile manager\n\n",
    "\x1b[1;36mProfiles\x1b[0m\n",
    "  config-import    Import a profile; referenced files are embedded inline.\n",
    "  configs-list     List every profile you may see.\n",
    "  config-show      Print a profile's metadata and content.\n",
    "  config-manage    Rename, alias, or toggle the persistent tunnel flag.\n\n",
    "\x1b[1;36mAccess\x1b[0m\n",
    "  config-acl       Grant or revoke users, lock down, go public, or seal.\n",
    "  config-remove    Delete a profile (asks for confirmation).\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = VPNCONF_BEFORE_HELP,
    help_template = VPNCONF_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct VpnconfCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes (config-show adds the parsed directives)",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Import a configuration profile, embedding the files it references.",
        override_usage = "vpnconf config-import --config FILE [--name NAME] [--persistent] [--single-use]"
    )]
    ConfigImport(ImportArgs),
    #[command(
        about = "Rename a profile, set or delete its alias, or toggle persist-tun.",
        override_usage = "vpnconf config-manage --path PATH [--alias NAME | --alias-delete] [--rename NAME] [--persist-tun BOOL]"
    )]
    ConfigManage(ManageArgs),
    #[command(
        about = "Change who may use a profile; --seal makes it read-only for good.",
        override_usage = "vpnconf config-acl --path PATH [--grant USER]... [--revoke USER]... [--lock-down BOOL] [--public-access BOOL] [--seal] [--show]"
    )]
    ConfigAcl(AclArgs),
    #[command(
        about = "Show a profile's metadata and content.",
        override_usage = "vpnconf config-show --path PATH [--json]"
    )]
    ConfigShow(ShowArgs),
    #[command(
        about = "Remove a profile.",
        override_usage = "vpnconf config-remove --path PATH [--force]"
    )]
    ConfigRemove(RemoveArgs),
    #[command(about = "List the profiles available to you.")]
    ConfigsList,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(short, long, value_name = "FILE", help = "Configuration file to import")]
    pub config: PathBuf,
    #[arg(short, long, value_name = "NAME", help = "Profile name (defaults to FILE)")]
    pub name: Option<String>,
    #[arg(short, long, help = "Keep the profile across service restarts")]
    pub persistent: bool,
    #[arg(short, long, help = "Remove the profile once a session has used it")]
    pub single_use: bool,
}

#[derive(Args, Debug)]
pub struct PathArg {
    #[arg(short = 'o', long, value_name = "PATH", help = "Configuration path")]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct ManageArgs {
    #[command(flatten)]
    pub target: PathArg,
    #[arg(short, long, value_name = "NAME", help = "Set an alias for the profile")]
    pub alias: Option<String>,
    #[arg(long, help = "Delete the profile alias")]
    pub alias_delete: bool,
    #[arg(short, long, value_name = "NAME", help = "Rename the profile")]
    pub rename: Option<String>,
    #[arg(
        long,
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        help = "Keep the tunnel device across reconnects"
    )]
    pub persist_tun: Option<bool>,
}

#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct AclArgs {
    #[command(flatten)]
    pub target: PathArg,
    #[arg(short = 'G', long, value_name = "USER", help = "Grant a user access (repeatable)")]
    pub grant: Vec<String>,
    #[arg(short = 'R', long, value_name = "USER", help = "Revoke a user's access (repeatable)")]
    pub revoke: Vec<String>,
    #[arg(
        long,
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        help = "Only the owner may read the content"
    )]
    pub lock_down: Option<bool>,
    #[arg(
        long,
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        help = "Let every user read the profile"
    )]
    pub public_access: Option<bool>,
    #[arg(short = 'S', long, help = "Make the profile read-only (cannot be undone)")]
    pub seal: bool,
    #[arg(long, help = "Skip the confirmation prompt for --seal")]
    pub force: bool,
    #[arg(short, long, help = "Print the current access list")]
    pub show: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: PathArg,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub target: PathArg,
    #[arg(long, help = "Remove without asking for confirmation")]
    pub force: bool,
}
