use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

#[allow(dead_code)]
pub const DOCUMENTED_TEMPLATE: &str = "{namespace example}

/**
 * Says hello.
 * @param name who to greet
 * @param? greeting optional text
 */
{template .hello}
  {$greeting} {$name}
{/template}
";

pub fn soy_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("soy"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}
