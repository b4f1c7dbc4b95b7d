//! @PG (program) record management for SAM headers.
//!
//! The output header records provenance: a `juncfilt` @PG entry with the
//! version and full command line, chained to the input's last program via
//! the PP tag, with numeric suffixes on ID collisions.

use std::collections::HashSet;

use anyhow::Result;
use bstr::BString;
use noodles::sam::header::record::value::map::program::tag;
use noodles::sam::header::record::value::map::Program;
use noodles::sam::header::record::value::Map;
use noodles::sam::Header;

/// Program name recorded in @PG entries.
const PROGRAM_NAME: &str = "juncfilt";

/// The ID of the last program in the @PG chain: the one no other program
/// references through its PP tag.
#[must_use]
fn last_program_id(header: &Header) -> Option<String> {
    let programs = header.programs();
    let program_map = programs.as_ref();

    let referenced: HashSet<&[u8]> = program_map
        .values()
        .filter_map(|pg| pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID))
        .map(AsRef::as_ref)
        .collect();

    program_map
        .keys()
        .find(|id| !referenced.contains(id.as_slice()))
        .or_else(|| program_map.keys().next())
        .map(|id| String::from_utf8_lossy(id).to_string())
}

/// A program ID not already present in the header: `juncfilt`, then
/// `juncfilt.1`, `juncfilt.2`, ...
#[must_use]
fn unique_program_id(header: &Header) -> String {
    let programs = header.programs();
    let program_map = programs.as_ref();

    if !program_map.contains_key(PROGRAM_NAME.as_bytes()) {
        return PROGRAM_NAME.to_string();
    }

    (1..)
        .map(|i| format!("{PROGRAM_NAME}.{i}"))
        .find(|candidate| !program_map.contains_key(candidate.as_bytes()))
        .unwrap_or_else(|| format!("{PROGRAM_NAME}.{}", std::process::id()))
}

/// Appends a `juncfilt` @PG record with PP chaining to the header.
///
/// # Errors
/// Returns an error if the program record cannot be built or added.
pub fn add_pg_record(mut header: Header, version: &str, command_line: &str) -> Result<Header> {
    let previous_program = last_program_id(&header);
    let id = unique_program_id(&header);

    let mut builder = Map::<Program>::builder()
        .insert(tag::NAME, PROGRAM_NAME)
        .insert(tag::VERSION, version)
        .insert(tag::COMMAND_LINE, command_line);
    if let Some(pp) = &previous_program {
        builder = builder.insert(tag::PREVIOUS_PROGRAM_ID, pp.as_str());
    }
    let pg_record = builder.build()?;

    header.programs_mut().add(BString::from(id), pg_record)?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_empty_header() {
        let header = add_pg_record(Header::default(), "0.2.0", "juncfilt filter -i in.bam").unwrap();
        let programs = header.programs();
        assert_eq!(programs.as_ref().len(), 1);

        let pg = programs.as_ref().get(b"juncfilt".as_slice()).unwrap();
        assert_eq!(
            pg.other_fields().get(&tag::VERSION).map(AsRef::as_ref),
            Some(b"0.2.0".as_slice())
        );
        assert!(pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID).is_none());
    }

    #[test]
    fn test_chains_to_existing_program() {
        let mut header = Header::default();
        header.programs_mut().add(BString::from("hisat2"), Map::<Program>::default()).unwrap();

        let header = add_pg_record(header, "0.2.0", "juncfilt filter").unwrap();
        let programs = header.programs();
        let pg = programs.as_ref().get(b"juncfilt".as_slice()).unwrap();
        assert_eq!(
            pg.other_fields().get(&tag::PREVIOUS_PROGRAM_ID).map(AsRef::as_ref),
            Some(b"hisat2".as_slice())
        );
    }

    #[test]
    fn test_collision_gets_numeric_suffix() {
        let mut header = Header::default();
        header.programs_mut().add(BString::from("juncfilt"), Map::<Program>::default()).unwrap();

        let header = add_pg_record(header, "0.2.0", "juncfilt filter").unwrap();
        let programs = header.programs();
        assert_eq!(programs.as_ref().len(), 2);
        assert!(programs.as_ref().contains_key(b"juncfilt.1".as_slice()));
    }
}
