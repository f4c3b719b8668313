//! Pure scoring functions (C2). Deterministic, total: every record/query pair
//! produces a score, possibly zero.

use std::sync::LazyLock;

use regex::Regex;

use crate::record::{DirScore, FileScore, Record};

static DIR_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\](\w+)([/\\]|$)").unwrap());

/// Score a file-kind record (`record.is_dir == false`) against `query`.
pub fn score_file(record: &Record, query: &str) -> (i64, FileScore) {
    let mut score = FileScore::default();

    let l_query = query.to_lowercase();
    let l_name = record.name.to_lowercase();
    let l_permission = record.permissions.permission.to_lowercase();

    if l_name.contains(&l_query) {
        score.contains += 2;

        if record.name.contains(query) {
            score.exact += 2;
        }
        if record.name.starts_with(query) {
            score.start += 2;
        }
        if l_name.starts_with(&l_query) {
            score.start += 2;
        }
        for word in record.name.split(' ') {
            if word == query {
                score.word += 3;
            }
        }

        if !record.name.is_empty() {
            score.length += (10 * query.chars().count() as i64) / record.name.chars().count() as i64;
        }

        if query.starts_with('.') {
            let ext = record
                .name
                .rsplit('.')
                .next()
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            if record.name.ends_with(query) {
                score.extension += 5;
            } else if ext.starts_with(query) {
                score.extension += 3;
            } else if ext.to_lowercase().starts_with(&l_query) {
                score.extension += 2;
            }
        }
    }

    if l_permission.contains(&l_query) {
        score.permission += 2;
        if record.permissions.permission.contains(query) {
            score.permission += 2;
        }
        if record.permissions.permission.starts_with(query) {
            score.permission += 2;
        }
        for word in record.permissions.permission.split(' ') {
            if word == query {
                score.permission += 3;
            }
        }
    }

    if !record.is_dir && record.hash.contains_substring(query) {
        score.hash += 2;
    }

    let total = score.contains + score.exact + score.start + score.word + score.length + score.extension + score.hash;
    (total, score)
}

/// Score a directory-kind record (`record.is_dir == true`) against `query`.
pub fn score_dir(record: &Record, query: &str) -> (i64, DirScore) {
    let mut score = DirScore::default();

    let path = &record.full_path;
    let l_query = query.to_lowercase();
    let l_path = path.to_lowercase();
    let l_permission = record.permissions.permission.to_lowercase();

    if l_path.contains(&l_query) {
        score.contains += 2;
        if path.contains(query) {
            score.exact += 2;
        }
        if path.starts_with(query) {
            score.start += 2;
        }
        for caps in DIR_SEGMENT_RE.captures_iter(path) {
            if let Some(word) = caps.get(1)
                && word.as_str().contains(query)
            {
                score.word += 3;
            }
        }

        // Boost proportional to how many path segments line up with the query's,
        // position by position. Both sides split on a bare "/", unfiltered, to
        // match the source's own split exactly (including the empty leading
        // segment an absolute path produces).
        if query.starts_with('/') || query.starts_with('\\') {
            let path_segments: Vec<&str> = path.split('/').collect();
            let query_segments: Vec<&str> = query.split('/').collect();
            for (p, q) in path_segments.iter().zip(query_segments.iter()) {
                if p == q {
                    score.length += 2;
                }
                if p.contains(q) {
                    score.length += 1;
                }
            }
        }
    }

    if l_permission.contains(&l_query) {
        score.contains += 2;
        if record.permissions.permission.contains(query) {
            score.exact += 2;
        }
        if record.permissions.permission.starts_with(query) {
            score.start += 2;
        }
        for word in record.permissions.permission.split(' ') {
            if word == query {
                score.word += 3;
            }
        }
    }

    let total = score.contains + score.exact + score.start + score.word + score.length;
    (total, score)
}

/// Dispatch by `record.is_dir`, returning a total score and a tagged breakdown.
pub fn score_record(record: &Record, query: &str) -> (i64, crate::record::ScoreBreakdown) {
    if record.is_dir {
        let (total, breakdown) = score_dir(record, query);
        (total, crate::record::ScoreBreakdown::Dir(breakdown))
    } else {
        let (total, breakdown) = score_file(record, query);
        (total, crate::record::ScoreBreakdown::File(breakdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HashBundle, Permissions};
    use chrono::Utc;

    fn file_record(name: &str) -> Record {
        Record {
            name: name.to_string(),
            extension: String::new(),
            parent_path: "/home/alice".to_string(),
            full_path: format!("/home/alice/{name}"),
            size: 0,
            is_hidden: false,
            is_dir: false,
            is_cloud_placeholder: false,
            created_time: Utc::now(),
            mod_time: Utc::now(),
            accessed_time: Utc::now(),
            permissions: Permissions::default(),
            hash: HashBundle::default(),
            error: String::new(),
            attributes: Default::default(),
            transient: Default::default(),
        }
    }

    fn dir_record(path: &str) -> Record {
        let mut r = file_record("dir");
        r.is_dir = true;
        r.full_path = path.to_string();
        r
    }

    #[test]
    fn readme_exact_scenario() {
        let record = file_record("README.md");
        let (total, breakdown) = score_file(&record, "README");
        assert_eq!(breakdown.contains, 2);
        assert_eq!(breakdown.exact, 2);
        assert_eq!(breakdown.start, 4);
        assert_eq!(breakdown.word, 0);
        assert_eq!(breakdown.length, 6);
        assert_eq!(total, 14);
    }

    #[test]
    fn extension_suffix_scenario() {
        let record = file_record("photo.png");
        let (total, breakdown) = score_file(&record, ".png");
        assert_eq!(breakdown.contains, 2);
        assert_eq!(breakdown.exact, 2);
        assert_eq!(breakdown.start, 0);
        assert_eq!(breakdown.length, 4);
        assert_eq!(breakdown.extension, 5);
        assert_eq!(total, 13);
    }

    #[test]
    fn directory_segment_scenario() {
        // The segment regex matches non-overlapping boundary-delimited path
        // components; for "/home/alice/projects" that yields "home" and
        // "projects" ("alice" is skipped since the match consuming "/home/"
        // already advances past the slash that would start the next one).
        let record = dir_record("/home/alice/projects");
        let (total, breakdown) = score_dir(&record, "projects");
        assert_eq!(breakdown.contains, 2);
        assert_eq!(breakdown.exact, 2);
        assert_eq!(breakdown.start, 0);
        assert_eq!(breakdown.word, 3);
        assert_eq!(total, 7);
    }

    #[test]
    fn path_prefix_length_scenario() {
        // "/etc/passwd.bak" against query "/etc/passwd": every aligned segment
        // pair (including the empty leading one both paths share) contributes
        // both the exact-match and the containment bonus, since they are
        // independent ifs rather than an else-if.
        let record = dir_record("/etc/passwd.bak");
        let (total, breakdown) = score_dir(&record, "/etc/passwd");
        assert_eq!(breakdown.contains, 2);
        assert_eq!(breakdown.exact, 2);
        assert_eq!(breakdown.start, 2);
        assert_eq!(breakdown.word, 0);
        assert_eq!(breakdown.length, 7);
        assert_eq!(total, 13);
    }

    #[test]
    fn hash_substring_scenario() {
        let mut record = file_record("unrelated.bin");
        record.hash.md5 = "d41d8cd98f00b204e9800998ecf8427e".to_string();
        let (total, breakdown) = score_file(&record, "d41d8cd9");
        assert_eq!(breakdown.contains, 0);
        assert_eq!(breakdown.hash, 2);
        assert_eq!(total, 2);
    }

    #[test]
    fn permission_never_enters_file_total() {
        let mut record = file_record("irrelevant_name.txt");
        record.permissions.permission = "-rwxr-xr-x".to_string();
        let (total, breakdown) = score_file(&record, "rwx");
        assert!(breakdown.permission > 0);
        assert_eq!(total, 0);
    }
}
