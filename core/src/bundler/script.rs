//! Launcher script rendering (`sh` for Linux, `cmd` for Windows).

use std::path::PathBuf;

use emuforge_shared::TargetOs;

/// A word of the generated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Literal(String),
    /// Absolute path on the machine that runs the script.
    Path(PathBuf),
    /// `/`-separated path relative to the script's own directory.
    Relative(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub program: Word,
    pub args: Vec<Word>,
    pub env: Vec<(String, Word)>,
}

/// Single-quote for POSIX sh. Nothing is special inside single quotes except
/// the quote itself.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Double-quote for cmd.exe, escaping variable expansion.
pub fn cmd_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('%', "%%").replace('"', "\"\""))
}

fn comment_safe(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

fn sh_word(word: &Word) -> String {
    match word {
        Word::Literal(s) => sh_quote(s),
        Word::Path(p) => sh_quote(&p.to_string_lossy()),
        Word::Relative(r) => format!("\"$HERE\"/{}", sh_quote(r)),
    }
}

fn cmd_word(word: &Word) -> String {
    match word {
        Word::Literal(s) => cmd_quote(s),
        Word::Path(p) => cmd_quote(&p.to_string_lossy()),
        Word::Relative(r) => {
            let native = r.replace('/', "\\").replace('%', "%%").replace('"', "\"\"");
            format!("\"%~dp0{}\"", native)
        }
    }
}

impl Script {
    fn uses_relative(&self) -> bool {
        std::iter::once(&self.program)
            .chain(&self.args)
            .chain(self.env.iter().map(|(_, w)| w))
            .any(|w| matches!(w, Word::Relative(_)))
    }

    pub fn render(&self, os: TargetOs, title: &str) -> String {
        match os {
            TargetOs::Linux => self.render_sh(title),
            TargetOs::Windows => self.render_cmd(title),
        }
    }

    fn render_sh(&self, title: &str) -> String {
        let mut out = String::from("#!/bin/sh\n");
        out.push_str(&format!("# EmuForge launcher: {}\n", comment_safe(title)));
        if self.uses_relative() {
            out.push_str("HERE=\"$(cd \"$(dirname \"$0\")\" && pwd)\"\n");
        }
        for (key, value) in &self.env {
            out.push_str(&format!("export {}={}\n", key, sh_word(value)));
        }
        out.push_str("exec ");
        out.push_str(&sh_word(&self.program));
        for arg in &self.args {
            out.push(' ');
            out.push_str(&sh_word(arg));
        }
        out.push_str(" \"$@\"\n");
        out
    }

    fn render_cmd(&self, title: &str) -> String {
        let mut lines = vec![
            "@echo off".to_string(),
            format!("rem EmuForge launcher: {}", comment_safe(title)),
            "setlocal".to_string(),
        ];
        for (key, value) in &self.env {
            // `set "K=V"` takes the value verbatim, so drop the outer quotes.
            let word = cmd_word(value);
            let inner = &word[1..word.len() - 1];
            lines.push(format!("set \"{}={}\"", key, inner));
        }
        let mut command = cmd_word(&self.program);
        for arg in &self.args {
            command.push(' ');
            command.push_str(&cmd_word(arg));
        }
        command.push_str(" %*");
        lines.push(command);
        let mut out = lines.join("\r\n");
        out.push_str("\r\n");
        out
    }
}
