//! Offline derivation pipeline (§4.H): walks a data directory and
//! precomputes the face isets, per-person isets, num-faces ilist, and
//! per-tag ilists that `telecast-server` serves queries against.
//!
//! Mirrors `derive_data.py`'s worker-pool shape: one task per output file,
//! fanned out with `rayon` instead of a `multiprocessing.Pool`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use telecast_engine::context::{ContextPaths, DataContext};
use telecast_engine::derive::{
    derive_face_iset_for_video, derive_num_faces_for_video, derive_person_iset_for_video,
    derive_tag_intervals, missing_ids, FACE_MASK_SPECS,
};
use telecast_engine::index::writer::{IntervalListMappingWriter, IntervalSetMappingWriter};
use telecast_engine::index::MmapIntervalListMapping;
use telecast_engine::interval::PayloadInterval;
use telecast_engine::tag::{sanitize_tag, MAX_PERSON_ATTRIBUTE_LEN, MIN_PERSON_ATTRIBUTE_LEN};

/// `derive_data.py`'s CLI, carried over field-for-field.
#[derive(Parser, Debug)]
#[command(name = "telecast-derive")]
#[command(about = "Precomputes derived face/person/tag indices for telecast-server")]
struct Args {
    #[arg(long, default_value = "data")]
    datadir: PathBuf,

    /// Skip video ids already present in an output file instead of
    /// rebuilding it from scratch.
    #[arg(short, long)]
    incremental: bool,

    /// Tags carried by at least this many people get a precomputed ilist.
    #[arg(short, long, default_value_t = 250)]
    tag_limit: usize,

    /// Person ilists smaller than this (bytes) are skipped unless a
    /// derived iset for them already exists.
    #[arg(short, long, default_value_t = 1 << 20)]
    person_limit: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "telecast_derive=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let outdir = args.datadir.join("derived");
    std::fs::create_dir_all(&outdir)?;

    derive_face_isets(&args.datadir, &outdir, args.incremental)?;
    derive_num_faces_ilist(&args.datadir, &outdir, args.incremental)?;
    derive_person_isets(&args.datadir, args.person_limit, args.incremental)?;

    let metadata_path = args.datadir.join("people.metadata.json");
    if metadata_path.exists() {
        derive_tag_ilists(&args.datadir, &outdir, &metadata_path, args.tag_limit, args.incremental)?;
    } else {
        warn!("no people.metadata.json found, skipping tag ilist derivation");
    }

    info!("done");
    Ok(())
}

fn derive_face_isets(data_dir: &Path, outdir: &Path, incremental: bool) -> anyhow::Result<()> {
    let face_dir = outdir.join("face");
    std::fs::create_dir_all(&face_dir)?;

    let faces = Arc::new(MmapIntervalListMapping::open(data_dir.join("faces.ilist.bin"))?);
    let all_ids = faces.get_ids();

    FACE_MASK_SPECS.as_slice().par_iter().try_for_each(|spec| -> anyhow::Result<()> {
        let outfile = face_dir.join(spec.file_name);
        let video_ids = if incremental { missing_ids(&outfile, &all_ids) } else { all_ids.clone() };

        let entries: Vec<(u32, Vec<(u32, u32)>)> = video_ids
            .par_iter()
            .map(|&id| (id, derive_face_iset_for_video(&faces, id, spec.mask, spec.value)))
            .filter(|(_, intervals)| !intervals.is_empty())
            .collect();

        info!(file = spec.file_name, videos = entries.len(), "writing face iset");
        let mut writer = IntervalSetMappingWriter::create(outfile.as_path(), incremental);
        for (id, intervals) in &entries {
            writer.write(*id, intervals);
        }
        writer.finish()?;
        Ok(())
    })
}

fn derive_num_faces_ilist(data_dir: &Path, outdir: &Path, incremental: bool) -> anyhow::Result<()> {
    let outfile = outdir.join("num_faces.ilist.bin");
    let faces = MmapIntervalListMapping::open(data_dir.join("faces.ilist.bin"))?;
    let all_ids = faces.get_ids();
    let video_ids = if incremental { missing_ids(&outfile, &all_ids) } else { all_ids };

    // Timezone is irrelevant for duration math; UTC avoids a config lookup.
    let video_table = DataContext::load_videos(&ContextPaths {
        data_dir: data_dir.to_path_buf(),
        timezone: chrono_tz::UTC,
        min_person_screen_time_ms: 0,
        person_name_filter: None,
    })?;

    let entries: Vec<(u32, Vec<PayloadInterval>)> = video_ids
        .par_iter()
        .filter_map(|&id| {
            let video = video_table.get(id)?;
            let raw = faces.get_intervals(id, 0, 0, false);
            let (_, duration_ms) = video.entire_interval_ms();
            Some((id, derive_num_faces_for_video(&raw, duration_ms)))
        })
        .collect();

    info!(videos = entries.len(), "writing num-faces ilist");
    let mut writer = IntervalListMappingWriter::create(outfile.as_path(), incremental);
    for (id, intervals) in &entries {
        writer.write(*id, intervals);
    }
    writer.finish()?;
    Ok(())
}

fn person_name_from_file(path: &Path) -> Option<String> {
    path.file_name()?.to_str()?.strip_suffix(".ilist.bin").map(str::to_string)
}

fn derive_person_isets(data_dir: &Path, person_limit: u64, incremental: bool) -> anyhow::Result<()> {
    let dir = data_dir.join("persons");
    let Ok(read_dir) = std::fs::read_dir(&dir) else {
        warn!(dir = %dir.display(), "no persons directory, skipping person iset derivation");
        return Ok(());
    };

    let mut skipped = 0usize;
    let candidates: Vec<(PathBuf, PathBuf)> = read_dir
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.to_string_lossy().ends_with(".ilist.bin"))
        .filter_map(|path| {
            let name = person_name_from_file(&path)?;
            let outfile = dir.join(format!("{name}.iset.bin"));
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            if !outfile.exists() && size < person_limit {
                skipped += 1;
                return None;
            }
            Some((path, outfile))
        })
        .collect();

    if skipped > 0 {
        info!(skipped, "skipped small person ilists below the size threshold");
    }

    candidates.par_iter().try_for_each(|(path, outfile)| -> anyhow::Result<()> {
        let ilist = MmapIntervalListMapping::open(path)?;
        let all_ids = ilist.get_ids();
        let video_ids = if incremental { missing_ids(outfile, &all_ids) } else { all_ids };

        let entries: Vec<(u32, Vec<(u32, u32)>)> = video_ids
            .iter()
            .map(|&id| (id, derive_person_iset_for_video(&ilist, id)))
            .filter(|(_, intervals)| !intervals.is_empty())
            .collect();

        let mut writer = IntervalSetMappingWriter::create(outfile.as_path(), incremental);
        for (id, intervals) in &entries {
            writer.write(*id, intervals);
        }
        writer.finish()?;
        Ok(())
    })
}

fn derive_tag_ilists(
    data_dir: &Path,
    outdir: &Path,
    metadata_path: &Path,
    tag_limit: usize,
    incremental: bool,
) -> anyhow::Result<()> {
    let persons_dir = data_dir.join("persons");
    let people_available: std::collections::HashSet<String> = std::fs::read_dir(&persons_dir)?
        .filter_map(Result::ok)
        .filter_map(|entry| person_name_from_file(&entry.path()))
        .collect();

    let raw = std::fs::read_to_string(metadata_path)?;
    let parsed: BTreeMap<String, Vec<(String, String)>> = serde_json::from_str(&raw)?;

    let mut tag_to_people: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, tags) in parsed {
        let name_lower = name.to_lowercase();
        if !people_available.contains(&name_lower) {
            continue;
        }
        for (tag_name, _source) in tags {
            let sanitized = sanitize_tag(&tag_name);
            if sanitized.len() > MIN_PERSON_ATTRIBUTE_LEN && sanitized.len() < MAX_PERSON_ATTRIBUTE_LEN {
                tag_to_people.entry(sanitized).or_default().push(name_lower.clone());
            }
        }
    }

    let tags_dir = outdir.join("tags");
    std::fs::create_dir_all(&tags_dir)?;

    let qualifying: Vec<(String, Vec<String>)> = tag_to_people
        .into_iter()
        .filter(|(tag, people)| tags_dir.join(format!("{tag}.ilist.bin")).exists() || people.len() >= tag_limit)
        .collect();

    qualifying.par_iter().try_for_each(|(tag, people)| -> anyhow::Result<()> {
        let outfile = tags_dir.join(format!("{tag}.ilist.bin"));
        let ilists: Vec<MmapIntervalListMapping> = people
            .iter()
            .filter_map(|p| MmapIntervalListMapping::open(persons_dir.join(format!("{p}.ilist.bin"))).ok())
            .collect();

        let mut video_ids = std::collections::BTreeSet::new();
        for ilist in &ilists {
            video_ids.extend(ilist.get_ids());
        }
        let video_ids: Vec<u32> = video_ids.into_iter().collect();
        let video_ids = if incremental { missing_ids(&outfile, &video_ids) } else { video_ids };

        let mut writer = IntervalListMappingWriter::create(outfile.as_path(), incremental);
        for &id in &video_ids {
            let postings: Vec<PayloadInterval> =
                ilists.iter().flat_map(|ilist| ilist.get_intervals_with_payload(id, 0, 0)).collect();
            writer.write(id, &derive_tag_intervals(&postings));
        }
        writer.finish()?;
        info!(tag, people = people.len(), "wrote tag ilist");
        Ok(())
    })
}
