use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::exec;
use crate::project::Project;

/// Section totals from Berkeley-format `size` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sections {
    text: u64,
    data: u64,
    bss: u64,
}

impl Sections {
    /// `text` + `data`: what ends up in flash.
    fn flash(self) -> u64 {
        self.text.saturating_add(self.data)
    }

    /// `data` + `bss`: static RAM.
    fn ram(self) -> u64 {
        self.data.saturating_add(self.bss)
    }
}

/// Parse the first data row of `size -B -d` output:
///
/// ```text
///    text    data     bss     dec     hex filename
///    1234      56     789    2079     81f firmware.elf
/// ```
fn parse_berkeley(output: &str) -> Option<Sections> {
    let row = output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("text"))
        .nth(1)?;
    let mut cols = row.split_whitespace().map(str::parse::<u64>);
    Some(Sections {
        text: cols.next()?.ok()?,
        data: cols.next()?.ok()?,
        bss: cols.next()?.ok()?,
    })
}

fn usage_line(label: &str, used: u64, max: Option<u64>) -> String {
    match max {
        Some(max) if max > 0 => {
            #[allow(clippy::cast_precision_loss)]
            let pct = used as f64 * 100.0 / max as f64;
            format!("{label}: {pct:5.1}% (used {used} bytes from {max} bytes)")
        }
        _ => format!("{label}: used {used} bytes"),
    }
}

/// Print the firmware size report.
pub fn run(project: &Project, elf: &Path) -> Result<()> {
    println!();
    println!("{}", format!("Calculating size {}", elf.display()).cyan());

    let output = exec::capture(&project.env.size_report(elf), "Size report")?;
    let text = String::from_utf8_lossy(&output.stdout);

    println!("{}", "📊 Binary size:".cyan());
    for line in text.lines() {
        println!("   {}", line.dimmed());
    }

    if let Some(sections) = parse_berkeley(&text) {
        let upload = project.board.as_ref().map(|b| &b.upload);
        println!(
            "   {}",
            usage_line("RAM  ", sections.ram(), upload.and_then(|u| u.maximum_ram_size))
        );
        println!(
            "   {}",
            usage_line("Flash", sections.flash(), upload.and_then(|u| u.maximum_size))
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const BERKELEY: &str = "   text\t   data\t    bss\t    dec\t    hex\tfilename\n   \
                            1234\t     56\t    789\t   2079\t    81f\tfirmware.elf\n";

    #[test]
    fn parses_berkeley_row() {
        let sections = parse_berkeley(BERKELEY).unwrap();
        assert_eq!(
            sections,
            Sections {
                text: 1234,
                data: 56,
                bss: 789
            }
        );
        assert_eq!(sections.flash(), 1290);
        assert_eq!(sections.ram(), 845);
    }

    #[test]
    fn garbage_is_ignored() {
        assert_eq!(parse_berkeley("size: firmware.elf: file format not recognized"), None);
    }

    #[test]
    fn usage_with_and_without_maximum() {
        assert_eq!(
            usage_line("Flash", 16_384, Some(65_536)),
            "Flash:  25.0% (used 16384 bytes from 65536 bytes)"
        );
        assert_eq!(usage_line("RAM", 10, None), "RAM: used 10 bytes");
    }
}
