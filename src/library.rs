use crate::model::{CoverArt, Track, TrackId};
use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::prelude::{Accessor, ItemKey};
use lofty::probe::Probe;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

#[derive(Default)]
struct TagData {
    title: Option<String>,
    artist: Option<String>,
    art: Option<CoverArt>,
}

/// Recursively ingests a folder into a fresh catalog. Non-audio files are
/// skipped; tag failures fall back to filename-derived metadata. Entries are
/// path-sorted so ingestion order is stable across runs.
pub fn scan_folder(root: &Path) -> Vec<Track> {
    let paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();

    scan_files(paths)
}

/// Ingests an explicit set of files, for hosts that hand over a file list
/// instead of a folder. Same filtering and fallback rules as `scan_folder`.
pub fn scan_files(paths: Vec<PathBuf>) -> Vec<Track> {
    let mut paths: Vec<PathBuf> = paths.into_iter().filter(|path| is_audio(path)).collect();
    paths.sort();
    paths.dedup();

    paths
        .into_iter()
        .enumerate()
        .map(|(id, path)| track_from_path(id, path))
        .collect()
}

fn track_from_path(id: TrackId, path: PathBuf) -> Track {
    let tags = read_tags(&path).unwrap_or_default();
    let title = tags
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("unknown")
                .to_string()
        });

    Track {
        id,
        source: path,
        title,
        artist: tags.artist.filter(|artist| !artist.trim().is_empty()),
        art: tags.art,
    }
}

fn read_tags(path: &Path) -> Option<TagData> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag())?;

    let title = tag
        .title()
        .map(|value| value.to_string())
        .or_else(|| tag.get_string(&ItemKey::TrackTitle).map(str::to_string));
    let artist = tag
        .artist()
        .map(|value| value.to_string())
        .or_else(|| tag.get_string(&ItemKey::TrackArtist).map(str::to_string));

    let art = tag
        .pictures()
        .iter()
        .find(|picture| picture.pic_type() == PictureType::CoverFront)
        .or_else(|| tag.pictures().first())
        .filter(|picture| !picture.data().is_empty())
        .map(|picture| CoverArt {
            mime: picture
                .mime_type()
                .map(|mime| mime.as_str().to_string())
                .unwrap_or_else(|| String::from("image/jpeg")),
            data: picture.data().to_vec(),
        });

    Some(TagData { title, artist, art })
}

fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_filters_non_audio_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp3"), b"x").expect("write mp3");
        fs::write(dir.path().join("b.txt"), b"x").expect("write txt");

        let tracks = scan_folder(dir.path());
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].source.ends_with("a.mp3"));
        assert_eq!(tracks[0].title, "a");
        assert_eq!(tracks[0].artist, None);
        assert_eq!(tracks[0].art, None);
    }

    #[test]
    fn scan_descends_into_subfolders() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("album")).expect("mkdir");
        fs::write(dir.path().join("album").join("deep.flac"), b"x").expect("write");
        fs::write(dir.path().join("top.mp3"), b"x").expect("write");

        let tracks = scan_folder(dir.path());
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn ids_are_catalog_positions() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("b.mp3"), b"x").expect("write");
        fs::write(dir.path().join("a.mp3"), b"x").expect("write");

        let tracks = scan_folder(dir.path());
        let ids: Vec<_> = tracks.iter().map(|track| track.id).collect();
        assert_eq!(ids, vec![0, 1]);
        // Path-sorted, so a.mp3 gets id 0 regardless of write order.
        assert!(tracks[0].source.ends_with("a.mp3"));
    }

    #[test]
    fn unreadable_tags_fall_back_to_filename() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("My Song.mp3");
        fs::write(&path, b"not really audio").expect("write");

        let tracks = scan_files(vec![path]);
        assert_eq!(tracks[0].title, "My Song");
        assert_eq!(tracks[0].artist_label(), "Unknown Artist");
    }

    #[test]
    fn scan_files_dedups_and_drops_unsupported() {
        let dir = tempdir().expect("tempdir");
        let song = dir.path().join("song.ogg");
        let note = dir.path().join("note.txt");
        fs::write(&song, b"x").expect("write");
        fs::write(&note, b"x").expect("write");

        let tracks = scan_files(vec![song.clone(), note, song]);
        assert_eq!(tracks.len(), 1);
    }
}
