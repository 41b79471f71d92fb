use anyhow::{Context, Result};
use builder::targets::{needs_rebuild, Target};
use builder::{HexRule, ToolCommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::exec;
use crate::project::Project;

/// Stem of the linked program and its hex image.
pub const FIRMWARE: &str = "firmware";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    C,
    Cxx,
    Asm,
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    match path.extension()?.to_str()? {
        "c" => Some(SourceKind::C),
        "cpp" | "cc" | "cxx" | "ino" => Some(SourceKind::Cxx),
        "S" | "s" | "sx" => Some(SourceKind::Asm),
        _ => None,
    }
}

/// `<obj_dir>/<file name>.o`, e.g. `main.cpp` → `main.cpp.o`.
fn object_path(obj_dir: &Path, src: &Path) -> Option<PathBuf> {
    let mut name = src.file_name()?.to_os_string();
    name.push(".o");
    Some(obj_dir.join(name))
}

/// Compile every configured source and link the firmware ELF.
pub fn program(project: &Project) -> Result<PathBuf> {
    let env = &project.env;
    let board = project.board_id.as_deref().unwrap_or("no board");

    println!();
    println!(
        "{}",
        format!("🔨 Building firmware ({board})...").cyan().bold()
    );

    let sources = &project.config.sources;
    if sources.is_empty() {
        anyhow::bail!("No sources configured; add `sources = [...]` to xmcbuild.toml");
    }

    let start = Instant::now();
    let obj_dir = env.build_dir.join("obj");
    std::fs::create_dir_all(&obj_dir)
        .with_context(|| format!("Failed to create {}", obj_dir.display()))?;

    let mut objects: Vec<PathBuf> = Vec::with_capacity(sources.len());
    for src in sources {
        let kind = source_kind(src)
            .with_context(|| format!("Don't know how to compile {}", src.display()))?;
        let obj = object_path(&obj_dir, src)
            .with_context(|| format!("Invalid source path {}", src.display()))?;
        if objects.contains(&obj) {
            anyhow::bail!("Two sources compile to {}; rename one of them", obj.display());
        }

        if needs_rebuild(Target::Program, &obj, &[src.as_path()]) {
            println!("   {}", format!("Compiling {}", src.display()).dimmed());
            let cmd: ToolCommand = match kind {
                SourceKind::C => env.compile_c(src, &obj),
                SourceKind::Cxx => env.compile_cxx(src, &obj),
                SourceKind::Asm => env.assemble(src, &obj),
            };
            exec::capture(&cmd, "Compile")?;
        }
        objects.push(obj);
    }

    let elf = env.program_path(FIRMWARE);
    let inputs: Vec<&Path> = objects.iter().map(PathBuf::as_path).collect();
    if needs_rebuild(Target::Program, &elf, &inputs) {
        println!("   {}", format!("Linking {}", elf.display()).dimmed());
        exec::capture(&env.link(&objects, &elf), "Link")?;
    }

    println!(
        "{}",
        format!("✓ Build successful in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(elf)
}

/// Convert the ELF to Intel HEX when it is out of date.
pub fn hex(project: &Project, elf: &Path, hex: &Path) -> Result<()> {
    let rule = HexRule::HEX;
    if !needs_rebuild(Target::Hex, hex, &[elf]) {
        tracing::debug!(hex = %hex.display(), "hex image is up to date");
        return Ok(());
    }
    println!("   {}", rule.describe(hex).dimmed());
    exec::capture(&rule.command(&project.env, elf, hex), "Hex conversion")?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_classified_by_extension() {
        assert_eq!(source_kind(Path::new("src/main.c")), Some(SourceKind::C));
        assert_eq!(source_kind(Path::new("src/app.cpp")), Some(SourceKind::Cxx));
        assert_eq!(source_kind(Path::new("sketch.ino")), Some(SourceKind::Cxx));
        assert_eq!(source_kind(Path::new("startup.S")), Some(SourceKind::Asm));
        assert_eq!(source_kind(Path::new("README.md")), None);
        assert_eq!(source_kind(Path::new("Makefile")), None);
    }

    #[test]
    fn objects_keep_source_extension() {
        let obj = object_path(Path::new("build/obj"), Path::new("src/main.cpp")).unwrap();
        assert_eq!(obj, Path::new("build/obj/main.cpp.o"));
    }
}
