//! schema loading
//!
//! reads a schema file, a directory of fragments, or an archive of
//! fragments, and merges the fragments into one sdl document. identical
//! re-declarations across fragments are dropped; diverging ones are
//! reported as [`Error::SchemaConflict`].

use crate::error::{Error, Result};
use graphql_parser::schema::{
    Definition, Document, EnumType, Field, InputObjectType, InputValue, ObjectType,
    TypeDefinition, TypeExtension,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use walkdir::WalkDir;

/// file extensions picked up from directories and archives
pub const SCHEMA_EXTENSIONS: [&str; 3] = ["graphql", "graphqls", "gql"];

/// one schema fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    /// display name (relative path, or `archive:path` for archive members)
    pub name: String,
    pub text: String,
}

impl SchemaFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// merged schema text plus where each definition came from
#[derive(Debug, Clone, Default)]
pub struct LoadedSchema {
    pub text: String,
    /// type name or `Type.field` key to the file that defined it
    pub sources: BTreeMap<String, String>,
    /// fragment names in processing order
    pub files: Vec<String>,
}

/// load a schema file, directory, or `.zip`/`.tar`/`.tar.gz`/`.tgz` archive
pub fn load_schema(path: &Path) -> Result<LoadedSchema> {
    let files = read_fragments(path)?;
    tracing::info!(path = %path.display(), fragments = files.len(), "loaded schema fragments");
    merge_fragments(files)
}

/// read the raw fragments behind a schema path
pub fn read_fragments(path: &Path) -> Result<Vec<SchemaFile>> {
    let metadata = std::fs::metadata(path).map_err(|err| Error::io(path, err))?;
    let mut files = if metadata.is_dir() {
        read_directory(path)?
    } else {
        match ArchiveKind::detect(path) {
            Some(kind) => read_archive(path, kind)?,
            None => {
                let text = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
                vec![SchemaFile::new(path.display().to_string(), text)]
            }
        }
    };

    if files.is_empty() {
        return Err(Error::Config(format!(
            "no schema files (.graphql, .graphqls, .gql) found in {}",
            path.display()
        )));
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn is_schema_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCHEMA_EXTENSIONS.contains(&ext))
}

fn read_directory(dir: &Path) -> Result<Vec<SchemaFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            match err.into_io_error() {
                Some(io) => Error::io(path, io),
                None => Error::Config(format!("cannot walk {}", path.display())),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !is_schema_file(&name) {
            continue;
        }
        tracing::debug!(file = %name, "reading schema fragment");
        let text =
            std::fs::read_to_string(entry.path()).map_err(|err| Error::io(entry.path(), err))?;
        files.push(SchemaFile::new(name, text));
    }
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveKind {
    fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

fn read_archive(path: &Path, kind: ArchiveKind) -> Result<Vec<SchemaFile>> {
    let file = File::open(path).map_err(|err| Error::io(path, err))?;
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let archive_error = |message: String| Error::Archive {
        path: path.to_path_buf(),
        message,
    };

    let mut files = Vec::new();
    match kind {
        ArchiveKind::Zip => {
            let mut archive = zip::ZipArchive::new(BufReader::new(file))
                .map_err(|err| archive_error(err.to_string()))?;
            for idx in 0..archive.len() {
                let mut entry = archive
                    .by_index(idx)
                    .map_err(|err| archive_error(err.to_string()))?;
                if entry.is_dir() || !is_schema_file(entry.name()) {
                    continue;
                }
                let name = entry.name().to_string();
                let mut text = String::new();
                entry
                    .read_to_string(&mut text)
                    .map_err(|err| archive_error(format!("{name}: {err}")))?;
                files.push(SchemaFile::new(format!("{label}:{name}"), text));
            }
        }
        ArchiveKind::Tar => read_tar(BufReader::new(file), &label, &mut files)
            .map_err(|err| archive_error(err.to_string()))?,
        ArchiveKind::TarGz => read_tar(
            flate2::read::GzDecoder::new(BufReader::new(file)),
            &label,
            &mut files,
        )
        .map_err(|err| archive_error(err.to_string()))?,
    }
    tracing::debug!(archive = %label, fragments = files.len(), "read archive");
    Ok(files)
}

fn read_tar<R: Read>(reader: R, label: &str, files: &mut Vec<SchemaFile>) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        if !is_schema_file(&name) {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        files.push(SchemaFile::new(format!("{label}:{name}"), text));
    }
    Ok(())
}

type Def<'a> = Definition<'a, String>;

/// tracks the first definition of every merge key
#[derive(Default)]
struct Merger<'a> {
    /// key to (file, normalized rendering)
    seen: BTreeMap<String, (String, String)>,
    kept: Vec<Def<'a>>,
    sources: BTreeMap<String, String>,
}

impl<'a> Merger<'a> {
    /// true if the key is new; errors if it exists with a different shape
    fn claim(&mut self, key: &str, file: &str, rendered: String) -> Result<bool> {
        match self.seen.get(key) {
            None => {
                self.seen
                    .insert(key.to_string(), (file.to_string(), rendered));
                Ok(true)
            }
            Some((_, existing)) if *existing == rendered => {
                tracing::debug!(key, file, "dropping identical re-declaration");
                Ok(false)
            }
            Some((first, _)) => Err(Error::SchemaConflict {
                name: key.to_string(),
                first: first.clone(),
                second: file.to_string(),
            }),
        }
    }

    fn add(&mut self, def: Def<'a>, file: &str) -> Result<()> {
        match def {
            Definition::TypeDefinition(mut ty) => {
                let name = type_definition_name(&ty).to_string();
                if !self.claim(&name, file, render_type(&ty))? {
                    return Ok(());
                }
                self.sources.insert(name.clone(), file.to_string());
                match &mut ty {
                    TypeDefinition::Object(obj) => {
                        let fields = std::mem::take(&mut obj.fields);
                        obj.fields = self.claim_fields(&name, file, fields)?;
                    }
                    TypeDefinition::Interface(iface) => {
                        iface.fields =
                            self.claim_fields(&name, file, std::mem::take(&mut iface.fields))?;
                    }
                    TypeDefinition::InputObject(input) => {
                        input.fields =
                            self.claim_inputs(&name, file, std::mem::take(&mut input.fields))?;
                    }
                    _ => {}
                }
                self.kept.push(Definition::TypeDefinition(ty));
            }
            Definition::TypeExtension(mut ext) => {
                let keep = match &mut ext {
                    TypeExtension::Object(obj) => {
                        let name = obj.name.clone();
                        let fields = std::mem::take(&mut obj.fields);
                        obj.fields = self.claim_fields(&name, file, fields)?;
                        !obj.fields.is_empty()
                            || !obj.implements_interfaces.is_empty()
                            || !obj.directives.is_empty()
                    }
                    TypeExtension::Interface(iface) => {
                        let name = iface.name.clone();
                        iface.fields =
                            self.claim_fields(&name, file, std::mem::take(&mut iface.fields))?;
                        !iface.fields.is_empty() || !iface.directives.is_empty()
                    }
                    TypeExtension::InputObject(input) => {
                        let name = input.name.clone();
                        input.fields =
                            self.claim_inputs(&name, file, std::mem::take(&mut input.fields))?;
                        !input.fields.is_empty() || !input.directives.is_empty()
                    }
                    _ => true,
                };
                if keep {
                    self.kept.push(Definition::TypeExtension(ext));
                }
            }
            Definition::SchemaDefinition(schema) => {
                let rendered = render(vec![Definition::SchemaDefinition(schema.clone())]);
                if self.claim("schema", file, rendered)? {
                    self.kept.push(Definition::SchemaDefinition(schema));
                }
            }
            Definition::DirectiveDefinition(directive) => {
                let key = format!("@{}", directive.name);
                let rendered = render(vec![Definition::DirectiveDefinition(directive.clone())]);
                if self.claim(&key, file, rendered)? {
                    self.kept.push(Definition::DirectiveDefinition(directive));
                }
            }
        }
        Ok(())
    }

    fn claim_fields(
        &mut self,
        type_name: &str,
        file: &str,
        fields: Vec<Field<'a, String>>,
    ) -> Result<Vec<Field<'a, String>>> {
        let mut kept = Vec::with_capacity(fields.len());
        for field in fields {
            let key = format!("{type_name}.{}", field.name);
            if self.claim(&key, file, render_field(&field))? {
                self.sources.entry(key).or_insert_with(|| file.to_string());
                kept.push(field);
            }
        }
        Ok(kept)
    }

    fn claim_inputs(
        &mut self,
        type_name: &str,
        file: &str,
        fields: Vec<InputValue<'a, String>>,
    ) -> Result<Vec<InputValue<'a, String>>> {
        let mut kept = Vec::with_capacity(fields.len());
        for field in fields {
            let key = format!("{type_name}.{}", field.name);
            if self.claim(&key, file, render_input(&field))? {
                self.sources.entry(key).or_insert_with(|| file.to_string());
                kept.push(field);
            }
        }
        Ok(kept)
    }
}

/// parse and merge fragments into one schema
pub fn merge_fragments(files: Vec<SchemaFile>) -> Result<LoadedSchema> {
    let mut merger = Merger::default();

    for file in &files {
        let document = parse_fragment(file)?;
        for def in document.definitions {
            merger.add(def, &file.name)?;
        }
    }

    Ok(LoadedSchema {
        text: render(merger.kept),
        sources: merger.sources,
        files: files.into_iter().map(|f| f.name).collect(),
    })
}

fn parse_fragment(file: &SchemaFile) -> Result<Document<'_, String>> {
    graphql_parser::parse_schema::<String>(&file.text)
        .map_err(|err| Error::Parse {
            source_name: file.name.clone(),
            message: err.to_string(),
        })
}

fn type_definition_name<'b>(ty: &'b TypeDefinition<'_, String>) -> &'b str {
    match ty {
        TypeDefinition::Scalar(t) => &t.name,
        TypeDefinition::Object(t) => &t.name,
        TypeDefinition::Interface(t) => &t.name,
        TypeDefinition::Union(t) => &t.name,
        TypeDefinition::Enum(t) => &t.name,
        TypeDefinition::InputObject(t) => &t.name,
    }
}

fn render(definitions: Vec<Def<'_>>) -> String {
    Document { definitions }.to_string()
}

/// rendering with descriptions stripped, used as the merge identity
fn render_type(ty: &TypeDefinition<'_, String>) -> String {
    let mut ty = ty.clone();
    match &mut ty {
        TypeDefinition::Scalar(t) => t.description = None,
        TypeDefinition::Object(t) => {
            t.description = None;
            t.fields.iter_mut().for_each(strip_field);
        }
        TypeDefinition::Interface(t) => {
            t.description = None;
            t.fields.iter_mut().for_each(strip_field);
        }
        TypeDefinition::Union(t) => t.description = None,
        TypeDefinition::Enum(t) => strip_enum(t),
        TypeDefinition::InputObject(t) => {
            t.description = None;
            t.fields.iter_mut().for_each(strip_input);
        }
    }
    render(vec![Definition::TypeDefinition(ty)])
}

fn render_field(field: &Field<'_, String>) -> String {
    let mut field = field.clone();
    strip_field(&mut field);
    let holder = ObjectType {
        position: field.position,
        description: None,
        name: "_".to_string(),
        implements_interfaces: Vec::new(),
        directives: Vec::new(),
        fields: vec![field],
    };
    render(vec![Definition::TypeDefinition(TypeDefinition::Object(holder))])
}

fn render_input(input: &InputValue<'_, String>) -> String {
    let mut input = input.clone();
    strip_input(&mut input);
    let holder = InputObjectType {
        position: input.position,
        description: None,
        name: "_".to_string(),
        directives: Vec::new(),
        fields: vec![input],
    };
    render(vec![Definition::TypeDefinition(TypeDefinition::InputObject(holder))])
}

fn strip_field(field: &mut Field<'_, String>) {
    field.description = None;
    field.arguments.iter_mut().for_each(strip_input);
}

fn strip_input(input: &mut InputValue<'_, String>) {
    input.description = None;
}

fn strip_enum(ty: &mut EnumType<'_, String>) {
    ty.description = None;
    for value in &mut ty.values {
        value.description = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn merge(files: &[(&str, &str)]) -> Result<LoadedSchema> {
        merge_fragments(
            files
                .iter()
                .map(|(name, text)| SchemaFile::new(*name, *text))
                .collect(),
        )
    }

    #[test]
    fn test_identical_redeclaration_is_dropped() {
        let loaded = merge(&[
            ("a.graphql", "enum Status { ACTIVE INACTIVE }\ntype Query { status: Status }"),
            ("b.graphql", "\"status docs\"\nenum Status { ACTIVE INACTIVE }"),
        ])
        .unwrap();
        assert_eq!(loaded.text.matches("enum Status").count(), 1);
        assert_eq!(loaded.sources["Status"], "a.graphql");
    }

    #[test]
    fn test_conflicting_redeclaration_names_both_files() {
        let err = merge(&[
            ("a.graphql", "enum Status { ACTIVE INACTIVE }"),
            ("b.graphql", "enum Status { ACTIVE DELETED }"),
        ])
        .unwrap_err();
        match err {
            Error::SchemaConflict {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "Status");
                assert_eq!(first, "a.graphql");
                assert_eq!(second, "b.graphql");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extension_fields_are_keyed() {
        let loaded = merge(&[
            ("a.graphql", "type Query { a: Int }"),
            ("b.graphql", "extend type Query { b: Int }"),
            ("c.graphql", "extend type Query { b: Int }"),
        ])
        .unwrap();
        assert_eq!(loaded.sources["Query.b"], "b.graphql");
        assert_eq!(loaded.text.matches("b: Int").count(), 1);

        let err = merge(&[
            ("a.graphql", "type Query { a: Int }"),
            ("b.graphql", "extend type Query { a: String }"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaConflict { name, .. } if name == "Query.a"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = merge(&[("broken.graphql", "type Query {")]).unwrap_err();
        assert!(matches!(err, Error::Parse { source_name, .. } if source_name == "broken.graphql"));
    }

    #[test]
    fn test_directory_walk_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.graphqls"), "type B { id: ID }").unwrap();
        std::fs::write(dir.path().join("nested/a.gql"), "type A { id: ID }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a schema").unwrap();

        let files = read_fragments(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.graphqls", "nested/a.gql"]);
    }

    #[test]
    fn test_zip_archive_is_read_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.zip");
        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("types.graphql", options).unwrap();
            zip.write_all(b"type Query { ok: Boolean }").unwrap();
            zip.start_file("README.md", options).unwrap();
            zip.write_all(b"# docs").unwrap();
            zip.finish().unwrap();
        }

        let loaded = load_schema(&path).unwrap();
        assert_eq!(loaded.files, vec!["schema.zip:types.graphql"]);
        assert!(loaded.text.contains("type Query"));
    }

    #[test]
    fn test_tgz_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.tgz");
        {
            let file = File::create(&path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let body = b"type Query { ok: Boolean }";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "schema/query.graphql", &body[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let loaded = load_schema(&path).unwrap();
        assert_eq!(loaded.files, vec!["schema.tgz:schema/query.graphql"]);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_fragments(dir.path()), Err(Error::Config(_))));
    }
}
