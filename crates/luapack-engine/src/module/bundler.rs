//! Executable preamble generation
//!
//! Turns a [`ProjectStructure`] into Lua code that evaluates every module
//! into `package.loaded` in dependency order. Once the preamble has run, a
//! `require` for any bundled name returns the cached module instead of
//! searching the filesystem.
//!
//! Layout of the generated code, one statement per module:
//!
//! ```lua
//! -- module: "lib.util"
//! _G.package.loaded["lib.util"] = (function(...)
//! <module source>
//! end)("lib.util", "/project/lib/util.lua") or _G.package.loaded["lib.util"] or true
//! _G.package.loaded["util"] = _G.package.loaded["lib.util"]
//! ```
//!
//! Loaders are anonymous so the preamble declares no locals of its own; the
//! entry script keeps the whole local budget of the chunk.

use super::record::ProjectStructure;

/// Table consulted by `require` before any searcher runs
pub const LOADED_TABLE: &str = "_G.package.loaded";

/// Generate the preamble for a project. Empty when there is nothing to bundle.
pub fn bundle(structure: &ProjectStructure) -> String {
    let mut preamble = String::new();

    for module in structure {
        let name = lua_string(&module.name);
        // Second argument matches the loader data `require` passes for files
        let path = lua_string(&module.path.display().to_string());

        preamble.push_str(&format!("-- module: {}\n", name));
        preamble.push_str(&format!("{}[{}] = (function(...)\n", LOADED_TABLE, name));
        preamble.push_str(&without_shebang(&module.source));
        if !module.source.ends_with('\n') {
            preamble.push('\n');
        }
        // A nil result keeps whatever the module stored itself, as require does
        preamble.push_str(&format!(
            "end)({name}, {path}) or {table}[{name}] or true\n",
            name = name,
            path = path,
            table = LOADED_TABLE,
        ));

        for alias in &module.aliases {
            preamble.push_str(&format!(
                "{table}[{alias}] = {table}[{name}]\n",
                table = LOADED_TABLE,
                alias = lua_string(alias),
                name = name,
            ));
        }
    }

    // The caller supplies the newline separating preamble and entry script
    preamble.pop();
    preamble
}

/// Comment out a leading `#` line, which Lua only accepts at the very start
/// of a chunk. Line count is unchanged.
fn without_shebang(source: &str) -> std::borrow::Cow<'_, str> {
    if source.starts_with('#') {
        format!("--{}", source).into()
    } else {
        source.into()
    }
}

/// Quote a string as a Lua double-quoted literal
pub fn lua_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Three digits so a following digit is never read as part of it
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Preamble and entry script joined into one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledChunk {
    /// Code to hand to the execution environment
    pub code: String,
    /// Lines before the first line of the entry script
    pub entry_line_offset: usize,
}

impl AssembledChunk {
    /// Map a line number in the chunk back to the entry script.
    ///
    /// Returns `None` for lines inside the preamble.
    pub fn entry_line(&self, chunk_line: usize) -> Option<usize> {
        chunk_line
            .checked_sub(self.entry_line_offset)
            .filter(|&line| line > 0)
    }
}

/// Prepend a preamble to the entry script.
///
/// An empty preamble leaves the entry untouched so its line numbers stay
/// exact; otherwise the two are separated by a single newline and a
/// shebang on the entry is commented out.
pub fn assemble(preamble: &str, entry: &str) -> AssembledChunk {
    if preamble.is_empty() {
        return AssembledChunk {
            code: entry.to_string(),
            entry_line_offset: 0,
        };
    }

    AssembledChunk {
        code: format!("{}\n{}", preamble, without_shebang(entry)),
        entry_line_offset: preamble.matches('\n').count() + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::record::ModuleRecord;
    use std::path::PathBuf;

    fn record(name: &str, source: &str, aliases: &[&str]) -> ModuleRecord {
        ModuleRecord {
            path: PathBuf::from(format!("/project/{}.lua", name)),
            name: name.to_string(),
            aliases: aliases.iter().map(ToString::to_string).collect(),
            source: source.to_string(),
            references: Vec::new(),
        }
    }

    fn structure(modules: Vec<ModuleRecord>) -> ProjectStructure {
        ProjectStructure::new(PathBuf::from("/project/main.lua"), Vec::new(), modules, Vec::new())
    }

    #[test]
    fn test_empty_structure() {
        assert_eq!(bundle(&ProjectStructure::default()), "");
    }

    #[test]
    fn test_single_module_layout() {
        let preamble = bundle(&structure(vec![record("util", "return {}", &[])]));

        assert_eq!(
            preamble,
            "-- module: \"util\"\n\
             _G.package.loaded[\"util\"] = (function(...)\n\
             return {}\n\
             end)(\"util\", \"/project/util.lua\") or _G.package.loaded[\"util\"] or true"
        );
    }

    #[test]
    fn test_registrations_follow_structure_order() {
        let preamble = bundle(&structure(vec![
            record("c", "return 'c'", &[]),
            record("b", "return require('c')", &[]),
            record("a", "return require('b')", &[]),
        ]));

        let at = |needle: &str| preamble.find(needle).unwrap();
        assert!(at("_G.package.loaded[\"c\"] =") < at("_G.package.loaded[\"b\"] ="));
        assert!(at("_G.package.loaded[\"b\"] =") < at("_G.package.loaded[\"a\"] ="));
    }

    #[test]
    fn test_alias_reuses_cached_module() {
        let preamble = bundle(&structure(vec![record("lib.util", "return {}", &["util"])]));

        assert_eq!(preamble.matches("(function(...)").count(), 1);
        assert!(preamble.ends_with(
            "_G.package.loaded[\"util\"] = _G.package.loaded[\"lib.util\"]"
        ));
    }

    #[test]
    fn test_alias_follows_its_module() {
        let preamble = bundle(&structure(vec![
            record("lib.util", "return {}", &["util"]),
            record("app", "return require('util')", &[]),
        ]));

        let alias = preamble
            .find("_G.package.loaded[\"util\"] = _G.package.loaded[\"lib.util\"]")
            .unwrap();
        assert!(alias < preamble.find("-- module: \"app\"").unwrap());
    }

    #[test]
    fn test_preamble_declares_no_locals() {
        let modules = (0..250)
            .map(|i| record(&format!("m{}", i), "local x = 1\nreturn x", &[]))
            .collect();
        let preamble = bundle(&structure(modules));

        let mut depth = 0usize;
        for line in preamble.lines() {
            if line.ends_with("= (function(...)") {
                depth += 1;
            } else if line.starts_with("end)(") {
                depth -= 1;
            } else if depth == 0 {
                assert!(!line.starts_with("local"), "top-level local: {}", line);
            }
        }
        assert_eq!(depth, 0);
        assert_eq!(preamble.matches("(function(...)").count(), 250);
    }

    #[test]
    fn test_loader_receives_module_path() {
        let mut module = record("a.b", "return ...", &[]);
        module.path = PathBuf::from("/project/dir \"q\"/a/b.lua");
        let preamble = bundle(&structure(vec![module]));

        assert!(preamble.contains("end)(\"a.b\", \"/project/dir \\\"q\\\"/a/b.lua\")"));
    }

    #[test]
    fn test_trailing_comment_does_not_swallow_end() {
        let preamble = bundle(&structure(vec![record("m", "return 1 -- done", &[])]));

        assert!(preamble.contains("return 1 -- done\nend)("));
    }

    #[test]
    fn test_shebang_commented_out() {
        let preamble = bundle(&structure(vec![record("tool", "#!/usr/bin/lua\nreturn 1\n", &[])]));

        assert!(preamble.contains("(function(...)\n--#!/usr/bin/lua\nreturn 1\nend)("));
    }

    #[test]
    fn test_lua_string_escapes() {
        assert_eq!(lua_string("plain"), "\"plain\"");
        assert_eq!(lua_string("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(lua_string("\u{1}2"), "\"\\0012\"");
    }

    #[test]
    fn test_assemble_without_preamble() {
        let chunk = assemble("", "print(1)");

        assert_eq!(chunk.code, "print(1)");
        assert_eq!(chunk.entry_line_offset, 0);
        assert_eq!(chunk.entry_line(1), Some(1));
    }

    #[test]
    fn test_assemble_with_preamble() {
        let chunk = assemble("local a = 1\nlocal b = 2", "print(a + b)");

        assert_eq!(chunk.code, "local a = 1\nlocal b = 2\nprint(a + b)");
        assert_eq!(chunk.entry_line_offset, 2);
        assert_eq!(chunk.entry_line(3), Some(1));
        assert_eq!(chunk.entry_line(2), None);
    }

    #[test]
    fn test_assemble_comments_out_entry_shebang() {
        let chunk = assemble("local x = 1", "#!/usr/bin/env lua\nprint(1)");

        assert!(!chunk.code.contains("\n#!"));
        assert_eq!(chunk.code, "local x = 1\n--#!/usr/bin/env lua\nprint(1)");
        assert_eq!(chunk.entry_line_offset, 1);
        assert_eq!(chunk.entry_line(3), Some(2));
    }

    #[test]
    fn test_assemble_keeps_shebang_without_preamble() {
        let chunk = assemble("", "#!/usr/bin/env lua\nprint(1)");

        assert_eq!(chunk.code, "#!/usr/bin/env lua\nprint(1)");
    }
}
