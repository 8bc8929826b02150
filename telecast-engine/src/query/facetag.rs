//! Face-tag resolution (§4.F): `face_tag(s)` atoms resolve either to one
//! of the nine precomputed face isets, or to a union over the ilists of
//! every person satisfying the tag's non-global part.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::DataContext;
use crate::error::{Error, Result};
use crate::index::{IListToISet, IsetReader, MmapIntervalListMapping, UnionIListsToISet};
use crate::interval::Interval;
use crate::person::FaceIntervals;
use crate::tag::{global_tags_in, parse_tags};

/// Face-name/tag union fuzz and pad, matching `get_face_tag_intervals`.
const FACE_TAG_FUZZ_MS: u32 = 3000;
const FACE_TAG_PAD_MS: u32 = 100;

#[derive(Debug)]
struct EmptyIset;

impl IsetReader for EmptyIset {
    fn get_intervals(&self, _video_id: u32, _deoverlap: bool) -> Vec<Interval> {
        Vec::new()
    }
    fn get_ids(&self) -> Vec<u32> {
        Vec::new()
    }
    fn has_id(&self, _video_id: u32) -> bool {
        false
    }
}

fn mask_value_for_globals(g: &BTreeSet<String>) -> Result<(u8, u8)> {
    let male = g.contains("male");
    let female = g.contains("female");
    let host = g.contains("host");
    let nonhost = g.contains("nonhost");
    if male && female {
        return Err(Error::InvalidUsage("cannot use male and female together".into()));
    }
    if host && nonhost {
        return Err(Error::InvalidUsage("cannot use host and nonhost together".into()));
    }

    let mut mask = 0u8;
    let mut value = 0u8;
    if male {
        mask |= 0b011;
        value |= 0b001;
    }
    if female {
        mask |= 0b011;
    }
    if host {
        mask |= 0b100;
        value |= 0b100;
    }
    if nonhost {
        mask |= 0b100;
    }
    Ok((mask, value))
}

fn precomputed_for(face: &FaceIntervals, mask: u8, value: u8) -> Arc<dyn IsetReader> {
    match (mask, value) {
        (0b000, 0b000) => face.all.clone(),
        (0b011, 0b001) => face.male.clone(),
        (0b011, 0b000) => face.female.clone(),
        (0b100, 0b100) => face.host.clone(),
        (0b100, 0b000) => face.nonhost.clone(),
        (0b111, 0b101) => face.male_host.clone(),
        (0b111, 0b001) => face.male_nonhost.clone(),
        (0b111, 0b100) => face.female_host.clone(),
        (0b111, 0b000) => face.female_nonhost.clone(),
        _ => face.all.clone(),
    }
}

pub fn resolve_face_tag(raw: &str, data: &DataContext) -> Result<Arc<dyn IsetReader>> {
    let parsed = parse_tags(raw);
    let global = global_tags_in(&parsed.tags);
    let (mask, value) = mask_value_for_globals(&global)?;

    let non_global: BTreeSet<String> = parsed.tags.difference(&global).cloned().collect();
    if non_global.is_empty() {
        return Ok(precomputed_for(&data.face, mask, value));
    }

    let mut persons: Option<BTreeSet<String>> = None;
    for tag in &non_global {
        let names = data
            .tags
            .tag_name_to_names(tag)
            .ok_or_else(|| Error::TagNotInDatabase(tag.clone()))?;
        persons = Some(match persons {
            Some(acc) => acc.intersection(names).cloned().collect(),
            None => names.clone(),
        });
    }
    let persons = persons.unwrap_or_default();
    if persons.is_empty() {
        return Ok(Arc::new(EmptyIset));
    }

    if non_global.len() == 1 {
        let only_tag = non_global.iter().next().unwrap();
        if let Some(cached) = data.cached_tag_ilists.get(only_tag) {
            return Ok(Arc::new(IListToISet::new(cached.clone(), mask, value, FACE_TAG_FUZZ_MS, FACE_TAG_PAD_MS)));
        }
    }

    let ilists: Vec<Arc<MmapIntervalListMapping>> = persons
        .iter()
        .filter_map(|name| data.person(name).map(|p| p.ilist.clone()))
        .collect();
    Ok(Arc::new(UnionIListsToISet::new(ilists, mask, value, FACE_TAG_FUZZ_MS, FACE_TAG_PAD_MS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_male_and_female_together() {
        let g = BTreeSet::from(["male".to_string(), "female".to_string()]);
        assert!(mask_value_for_globals(&g).is_err());
    }

    #[test]
    fn male_host_mask_matches_derivation() {
        let g = BTreeSet::from(["male".to_string(), "host".to_string()]);
        assert_eq!(mask_value_for_globals(&g).unwrap(), (0b111, 0b101));
    }

    #[test]
    fn all_alone_is_unmasked() {
        let g = BTreeSet::from(["all".to_string()]);
        assert_eq!(mask_value_for_globals(&g).unwrap(), (0b000, 0b000));
    }
}
