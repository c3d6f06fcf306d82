/// The four German transmission system operators. Each runs one control
/// zone; SMARD publishes generation and load per zone, with the zone
/// encoded in the downloaded filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlZone {
    Hertz50,
    Amprion,
    Tennet,
    TransnetBw,
}

impl ControlZone {
    pub const ALL: [ControlZone; 4] = [
        ControlZone::Hertz50,
        ControlZone::Amprion,
        ControlZone::Tennet,
        ControlZone::TransnetBw,
    ];

    /// Canonical label as it appears on the portal.
    pub fn label(&self) -> &'static str {
        match self {
            ControlZone::Hertz50 => "50Hertz",
            ControlZone::Amprion => "Amprion",
            ControlZone::Tennet => "TenneT",
            ControlZone::TransnetBw => "TransnetBW",
        }
    }

    /// Lowercase slug used in downloaded filenames.
    pub fn slug(&self) -> &'static str {
        match self {
            ControlZone::Hertz50 => "50hertz",
            ControlZone::Amprion => "amprion",
            ControlZone::Tennet => "tennet",
            ControlZone::TransnetBw => "transnetbw",
        }
    }

    /// Dropdown label on the SMARD download form.
    pub fn form_label(&self) -> String {
        format!("Control Area (DE): {}", self.label())
    }
}

/// Zone-name-to-ID table, injected into every cleaning job rather than
/// read from a module constant so alternate zone sets stay testable.
/// IDs are fixed by configuration, never derived from data.
#[derive(Debug, Clone)]
pub struct ZoneMap {
    entries: Vec<(String, u32)>,
}

impl ZoneMap {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        ZoneMap {
            entries: entries
                .into_iter()
                .map(|(name, id)| (name.into(), id))
                .collect(),
        }
    }

    /// The standard table: 50Hertz=1, Amprion=2, TenneT=3, TransnetBW=4.
    pub fn german_tsos() -> Self {
        ZoneMap::new(
            ControlZone::ALL
                .iter()
                .enumerate()
                .map(|(i, zone)| (zone.label(), i as u32 + 1)),
        )
    }

    /// Case-insensitive lookup, so both "TenneT" (portal label) and
    /// "tennet" (filename slug) resolve.
    pub fn id_of(&self, label: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, id)| *id)
    }

    /// Entries in configured order, for dimension-table loading.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }
}
