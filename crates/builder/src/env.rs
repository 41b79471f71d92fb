//! Build environment: toolchain, flag lists, defines and upload settings.
//!
//! `BuildEnv` is passed by `&mut` through each configuration step
//! ([`crate::configure`], [`crate::board_flags::augment`], upload preparation).
//! Toolchain names are replaced wholesale; flag lists are only ever appended to.

use std::path::{Path, PathBuf};

use crate::command::ToolCommand;

/// Cross-toolchain executables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    pub ar: String,
    pub asm: String,
    pub cc: String,
    pub cxx: String,
    pub gdb: String,
    pub objcopy: String,
    pub ranlib: String,
    pub size: String,
}

/// Per-language flag lists.
///
/// `cc` applies to both C and C++; `c` and `cxx` are language specific.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    pub ar: Vec<String>,
    pub asm: Vec<String>,
    pub c: Vec<String>,
    pub cc: Vec<String>,
    pub cxx: Vec<String>,
    pub link: Vec<String>,
}

/// A preprocessor define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Define {
    /// `-DNAME`
    Flag(String),
    /// `-DNAME=VALUE`
    Value(String, String),
}

impl Define {
    /// Define without a value.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::Flag(name.into())
    }

    /// Define with a value.
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Value(name.into(), value.into())
    }

    /// Macro name.
    pub fn name(&self) -> &str {
        match self {
            Self::Flag(name) | Self::Value(name, _) => name,
        }
    }

    /// Render as a compiler argument.
    pub fn to_flag(&self) -> String {
        match self {
            Self::Flag(name) => format!("-D{name}"),
            Self::Value(name, value) => format!("-D{name}={value}"),
        }
    }
}

/// Upload protocol, the port it talks to and the generated probe script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSettings {
    /// Upload protocol (`jlink`, `serial`, legacy `usb...`).
    pub protocol: String,
    /// Serial port or `net:` address.
    pub port: Option<String>,
    /// Baud rate for serial uploaders.
    pub speed: Option<u32>,
    /// Debug-probe command script, once generated.
    pub jlink_script: Option<PathBuf>,
}

/// Everything one build invocation needs to render tool commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    pub toolchain: Toolchain,
    pub flags: Flags,
    pub defines: Vec<Define>,
    pub libs: Vec<String>,
    /// Suffix of the linked program, `.elf`.
    pub prog_suffix: String,
    pub build_dir: PathBuf,
    /// Board-support package root (`variants/<family>/linker_script.ld`).
    pub framework_dir: PathBuf,
    /// Size report command without the input file; `None` uses plain `size`.
    pub size_print: Option<Vec<String>>,
    pub upload: UploadSettings,
}

impl BuildEnv {
    /// Path of the linker memory map.
    pub fn map_file(&self) -> PathBuf {
        let mut map = self.build_dir.join("hi").into_os_string();
        map.push(".map");
        PathBuf::from(map)
    }

    /// Path of the linked program, `<build_dir>/<stem><prog_suffix>`.
    pub fn program_path(&self, stem: &str) -> PathBuf {
        self.build_dir.join(format!("{stem}{}", self.prog_suffix))
    }

    fn define_flags(&self) -> impl Iterator<Item = String> + '_ {
        self.defines
            .iter()
            .filter(|d| !d.name().is_empty())
            .map(Define::to_flag)
    }

    /// `<cc> CFLAGS CCFLAGS -D.. -o <obj> <src>`
    pub fn compile_c(&self, src: &Path, obj: &Path) -> ToolCommand {
        ToolCommand::new(&self.toolchain.cc)
            .args(self.flags.c.iter().cloned())
            .args(self.flags.cc.iter().cloned())
            .args(self.define_flags())
            .arg("-o")
            .path(obj)
            .path(src)
    }

    /// `<cxx> CXXFLAGS CCFLAGS -D.. -o <obj> <src>`
    pub fn compile_cxx(&self, src: &Path, obj: &Path) -> ToolCommand {
        ToolCommand::new(&self.toolchain.cxx)
            .args(self.flags.cxx.iter().cloned())
            .args(self.flags.cc.iter().cloned())
            .args(self.define_flags())
            .arg("-o")
            .path(obj)
            .path(src)
    }

    /// Preprocessed assembly goes through the C driver: `<cc> ASFLAGS -D.. -o <obj> <src>`
    pub fn assemble(&self, src: &Path, obj: &Path) -> ToolCommand {
        ToolCommand::new(&self.toolchain.cc)
            .args(self.flags.asm.iter().cloned())
            .args(self.define_flags())
            .arg("-o")
            .path(obj)
            .path(src)
    }

    /// `<cc> -o <elf> LINKFLAGS <objects> -Wl,--start-group -l.. -Wl,--end-group`
    pub fn link(&self, objects: &[PathBuf], elf: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.toolchain.cc)
            .arg("-o")
            .path(elf)
            .args(self.flags.link.iter().cloned());
        for obj in objects {
            cmd = cmd.path(obj);
        }
        if self.libs.is_empty() {
            return cmd;
        }
        cmd.arg("-Wl,--start-group")
            .args(self.libs.iter().map(|lib| format!("-l{lib}")))
            .arg("-Wl,--end-group")
    }

    /// Size report for `elf`.
    pub fn size_report(&self, elf: &Path) -> ToolCommand {
        match &self.size_print {
            Some(argv) => {
                let mut parts = argv.iter();
                let program = parts.next().cloned().unwrap_or_else(|| self.toolchain.size.clone());
                ToolCommand::new(program).args(parts.cloned()).path(elf)
            }
            None => ToolCommand::new(&self.toolchain.size).path(elf),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn env() -> BuildEnv {
        BuildEnv {
            toolchain: Toolchain {
                cc: "gcc".into(),
                cxx: "g++".into(),
                size: "size".into(),
                ..Toolchain::default()
            },
            flags: Flags {
                c: vec!["-MMD".into()],
                cc: vec!["-Os".into(), "-c".into()],
                cxx: vec!["-fno-exceptions".into()],
                link: vec!["-nostdlib".into()],
                ..Flags::default()
            },
            defines: vec![
                Define::value("F_CPU", "32000000L"),
                Define::flag(""),
                Define::flag("XMC1100"),
            ],
            libs: vec!["m".into(), "c".into()],
            prog_suffix: ".elf".into(),
            build_dir: PathBuf::from("build"),
            ..BuildEnv::default()
        }
    }

    #[test]
    fn empty_defines_are_not_emitted() {
        let cmd = env().compile_c(Path::new("main.c"), Path::new("main.o"));
        assert_eq!(
            cmd.args,
            vec!["-MMD", "-Os", "-c", "-DF_CPU=32000000L", "-DXMC1100", "-o", "main.o", "main.c"]
        );
    }

    #[test]
    fn cxx_uses_cxx_then_common_flags() {
        let cmd = env().compile_cxx(Path::new("app.cpp"), Path::new("app.o"));
        assert_eq!(cmd.program, "g++");
        assert_eq!(cmd.args.first().map(String::as_str), Some("-fno-exceptions"));
        assert!(!cmd.args.contains(&"-MMD".to_string()));
    }

    #[test]
    fn link_groups_libraries() {
        let objs = vec![PathBuf::from("a.o"), PathBuf::from("b.o")];
        let cmd = env().link(&objs, Path::new("build/firmware.elf"));
        assert_eq!(
            cmd.to_string(),
            "gcc -o build/firmware.elf -nostdlib a.o b.o -Wl,--start-group -lm -lc -Wl,--end-group"
        );
    }

    #[test]
    fn map_file_sits_in_build_dir() {
        assert_eq!(env().map_file(), PathBuf::from("build/hi.map"));
        assert_eq!(env().program_path("firmware"), PathBuf::from("build/firmware.elf"));
    }

    #[test]
    fn size_report_defaults_to_plain_size() {
        let mut env = env();
        assert_eq!(env.size_report(Path::new("f.elf")).to_string(), "size f.elf");
        env.size_print = Some(vec!["arm-none-eabi-size".into(), "-B".into(), "-d".into()]);
        assert_eq!(
            env.size_report(Path::new("f.elf")).to_string(),
            "arm-none-eabi-size -B -d f.elf"
        );
    }
}
