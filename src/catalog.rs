//! Narrow interfaces to the catalog parsers (radio station lists, file
//! trees, podcast feeds, collection indexes). The parsers themselves live
//! outside this crate; screens pull from these traits at construction and
//! selection time, which is also where construction failure can originate.

use anyhow::Result;

use crate::player::Track;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Podcast {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub name: String,
    pub url: String,
}

pub trait StationCatalog {
    /// Stations for the given UI language.
    fn stations(&self, language: &str) -> Result<Vec<Station>>;
}

pub trait FileCatalog {
    /// Audio files under a folder.
    fn list(&self, folder: &str) -> Result<Vec<String>>;
    /// Playable tracks for a folder.
    fn tracks(&self, folder: &str) -> Result<Vec<Track>>;
}

pub trait PodcastCatalog {
    fn podcasts(&self) -> Result<Vec<Podcast>>;
    fn episodes(&self, podcast: usize) -> Result<Vec<Episode>>;
}

pub trait CollectionCatalog {
    fn topics(&self) -> Result<Vec<String>>;
    fn tracks(&self, topic: &str) -> Result<Vec<Track>>;
}

/// In-memory catalog used for wiring and demos: a couple of stations and
/// files per language/folder, no network or disk behind it.
#[derive(Debug, Default)]
pub struct StaticCatalog;

impl StationCatalog for StaticCatalog {
    fn stations(&self, _language: &str) -> Result<Vec<Station>> {
        Ok(vec![
            Station { name: "Classic FM".into(), url: "http://radio.example/classic".into() },
            Station { name: "Jazz 24".into(), url: "http://radio.example/jazz".into() },
            Station { name: "News".into(), url: "http://radio.example/news".into() },
        ])
    }
}

impl FileCatalog for StaticCatalog {
    fn list(&self, _folder: &str) -> Result<Vec<String>> {
        Ok(vec!["intro.mp3".into(), "side-a.flac".into(), "side-b.flac".into()])
    }

    fn tracks(&self, folder: &str) -> Result<Vec<Track>> {
        Ok(self
            .list(folder)?
            .into_iter()
            .map(|file| Track::new(file.clone(), format!("{folder}/{file}")))
            .collect())
    }
}

impl PodcastCatalog for StaticCatalog {
    fn podcasts(&self) -> Result<Vec<Podcast>> {
        Ok(vec![
            Podcast { name: "Daily Science".into(), url: "http://pod.example/science".into() },
            Podcast { name: "History Hour".into(), url: "http://pod.example/history".into() },
        ])
    }

    fn episodes(&self, podcast: usize) -> Result<Vec<Episode>> {
        let podcasts = self.podcasts()?;
        let name = podcasts
            .get(podcast)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "unknown".into());
        Ok((1..=3)
            .map(|n| Episode {
                name: format!("{name} episode {n}"),
                url: format!("http://pod.example/{podcast}/{n}"),
            })
            .collect())
    }
}

impl CollectionCatalog for StaticCatalog {
    fn topics(&self) -> Result<Vec<String>> {
        Ok(vec!["Ambient".into(), "Field Recordings".into()])
    }

    fn tracks(&self, topic: &str) -> Result<Vec<Track>> {
        Ok((1..=4)
            .map(|n| Track::new(format!("{topic} {n}"), format!("collection/{topic}/{n}.mp3")))
            .collect())
    }
}
