#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Exit,
    CountReference,
    BasementCarparks,
    LoadAvailability,
    CountAvailability,
    WithoutLots,
    AbovePercentage,
    AbovePercentageWithAddress,
    AtLocation,
    MostLots,
    WriteReport,
    LoadFullReference,
    ShowFavourites,
    AddFavourite,
    RemoveFavourite,
    NearestToAddress,
    LoadLiveAvailability,
}

impl MenuOption {
    pub const ALL: [MenuOption; 17] = [
        Self::Exit,
        Self::CountReference,
        Self::BasementCarparks,
        Self::LoadAvailability,
        Self::CountAvailability,
        Self::WithoutLots,
        Self::AbovePercentage,
        Self::AbovePercentageWithAddress,
        Self::AtLocation,
        Self::MostLots,
        Self::WriteReport,
        Self::LoadFullReference,
        Self::ShowFavourites,
        Self::AddFavourite,
        Self::RemoveFavourite,
        Self::NearestToAddress,
        Self::LoadLiveAvailability,
    ];

    pub fn from_number(n: usize) -> Option<Self> {
        Self::ALL.get(n).copied()
    }

    pub fn number(self) -> usize {
        self as usize
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Exit => "Exit",
            Self::CountReference => "Display Total Number of Carparks in the Reference Table",
            Self::BasementCarparks => "Display All Basement Carparks",
            Self::LoadAvailability => "Read Carpark Availability Data File",
            Self::CountAvailability => {
                "Print Total Number of Carparks in the Availability Snapshot"
            }
            Self::WithoutLots => "Display Carparks Without Available Lots",
            Self::AbovePercentage => "Display Carparks With At Least x% Available Lots",
            Self::AbovePercentageWithAddress => {
                "Display Addresses of Carparks With At Least x% Available Lots"
            }
            Self::AtLocation => "Display All Information About Carparks at a Location",
            Self::MostLots => "Display All Information About the Carpark With the Most Lots",
            Self::WriteReport => "Write the Carpark Availability and Address to a New File",
            Self::LoadFullReference => "Read Full Carpark Information File",
            Self::ShowFavourites => "Display All Information About Favourite Carparks",
            Self::AddFavourite => "Add Favourite Carpark",
            Self::RemoveFavourite => "Remove Favourite Carpark",
            Self::NearestToAddress => "Display Carparks Nearest to an Address",
            Self::LoadLiveAvailability => "Load Live Carpark Availability",
        }
    }

    /// Options that need an availability snapshot
    pub fn needs_snapshot(self) -> bool {
        matches!(
            self,
            Self::CountAvailability
                | Self::WithoutLots
                | Self::AbovePercentage
                | Self::AbovePercentageWithAddress
                | Self::AtLocation
                | Self::MostLots
                | Self::WriteReport
        )
    }

    /// Options that need the full reference table
    pub fn needs_full_reference(self) -> bool {
        matches!(
            self,
            Self::ShowFavourites
                | Self::AddFavourite
                | Self::RemoveFavourite
                | Self::NearestToAddress
        )
    }
}

/// Menu text, with Exit listed last as option 0
pub fn render() -> String {
    let mut menu = String::from("\nMENU\n====\n");
    for option in &MenuOption::ALL[1..] {
        menu.push_str(&format!("[{}]\t{}\n", option.number(), option.description()));
    }
    menu.push_str(&format!("[0]\t{}", MenuOption::Exit.description()));
    menu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_match_positions() {
        for (i, option) in MenuOption::ALL.iter().enumerate() {
            assert_eq!(option.number(), i);
            assert_eq!(MenuOption::from_number(i), Some(*option));
        }
        assert_eq!(MenuOption::from_number(17), None);
    }

    #[test]
    fn exit_is_listed_last() {
        let menu = render();
        assert!(menu.starts_with("\nMENU\n====\n[1]\t"));
        assert!(menu.ends_with("[0]\tExit"));
        assert!(menu.contains("[16]\tLoad Live Carpark Availability\n"));
    }

    #[test]
    fn gating_groups_do_not_overlap() {
        for option in MenuOption::ALL {
            assert!(!(option.needs_snapshot() && option.needs_full_reference()));
        }
    }
}
