use colored::Colorize;
use stackcraft_core::CloudResourceKind;

pub fn handle() -> anyhow::Result<()> {
    println!("{}", "Supported kinds:".bold());
    for kind in CloudResourceKind::ALL {
        println!(
            "  {:<24} {}",
            kind.to_string().cyan(),
            kind.provider().display_name()
        );
    }
    Ok(())
}
