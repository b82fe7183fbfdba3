use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

/// Outcome of pulling one value out of rendered text.
///
/// `Absent` means the source node was not on the page, `Failed` means it was
/// there but its text did not parse. Both go over the wire as `null`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Extract<T> {
    Value(T),
    #[default]
    Absent,
    Failed,
}

impl<T> Extract<T> {
    #[inline]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Failed => None,
        }
    }

    #[inline]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl<T: Serialize> Serialize for Extract<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Absent | Self::Failed => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Extract<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Self::Absent, Self::Value))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Points {
    pub earned: Extract<i64>,
    pub possible: Extract<i64>,
    pub raw_text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: Option<CompactString>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub completion_time: Option<String>,
    pub points: Points,
    pub progress: Option<CompactString>,
    pub initial_placement: Option<CompactString>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: String,
    pub daily_xp: String,
    pub tasks: Vec<TaskInfo>,
}

/// Day buckets in page order, serialized as a `date -> bucket` object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DailyActivity(pub Vec<DayActivity>);

impl DailyActivity {
    pub fn get(&self, date: &str) -> Option<&DayActivity> {
        self.0.iter().find(|day| day.date == date)
    }

    /// Opens a new bucket, replacing an earlier one with the same date.
    pub fn open(&mut self, day: DayActivity) -> &mut DayActivity {
        if let Some(i) = self.0.iter().position(|d| d.date == day.date) {
            self.0.remove(i);
        }
        self.0.push(day);
        let last = self.0.len() - 1;
        &mut self.0[last]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for DailyActivity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for day in &self.0 {
            map.serialize_entry(&day.date, day)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSegment {
    pub width: Extract<f64>,
    pub color: Option<CompactString>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub number: Option<CompactString>,
    pub name: Option<String>,
    pub status_color: Option<CompactString>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: Option<String>,
    pub topics: Vec<TopicInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub number: Option<CompactString>,
    pub name: Option<String>,
    pub total_topics: Option<CompactString>,
    pub progress_segments: Vec<ProgressSegment>,
    pub modules: Vec<ModuleInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Activity {
    pub daily_activity: DailyActivity,
    pub estimated_completion: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetailedInfo {
    pub student_url: String,
    pub daily_activity: DailyActivity,
    pub progress: Vec<UnitInfo>,
    pub estimated_completion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub name: Option<String>,
    pub percent_complete: Option<CompactString>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayProgress {
    pub points: Option<CompactString>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardInfo {
    pub course_info: CourseInfo,
    pub last_activity: Option<String>,
    pub today_progress: TodayProgress,
    pub weekly_xp: Option<CompactString>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudentRecord {
    pub name: String,
    pub student_id: CompactString,
    pub student_url: String,
    pub dashboard_info: DashboardInfo,
    pub detailed_info: DetailedInfo,
}

/// One run's capture, keyed by student id.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub timestamp: String,
    pub url: String,
    pub students: SnapshotStudents<'a>,
}

#[derive(Debug)]
pub struct SnapshotStudents<'a>(pub &'a [StudentRecord]);

impl Serialize for SnapshotStudents<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(&record.student_id, record)?;
        }
        map.end()
    }
}

impl<'a> Snapshot<'a> {
    pub fn new(url: String, records: &'a [StudentRecord]) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            url,
            students: SnapshotStudents(records),
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extract_failure_serializes_as_null() {
        let points = Points {
            earned: Extract::Failed,
            possible: Extract::Absent,
            raw_text: Some("-- XP".into()),
        };
        assert_eq!(
            serde_json::to_value(&points).unwrap(),
            json!({ "earned": null, "possible": null, "raw_text": "-- XP" }),
        );
        assert!(points.earned.is_failed());
        assert!(!points.possible.is_failed());
    }

    #[test]
    fn daily_activity_keeps_page_order() {
        let mut days = DailyActivity::default();
        for date in ["Wed, Oct 9", "Tue, Oct 8", "Mon, Oct 7"] {
            days.open(DayActivity {
                date: date.to_owned(),
                daily_xp: "0 XP".to_owned(),
                tasks: Vec::new(),
            });
        }
        let text = serde_json::to_string(&days).unwrap();
        let wed = text.find("Wed").unwrap();
        let tue = text.find("Tue").unwrap();
        let mon = text.find("Mon").unwrap();
        assert!(wed < tue && tue < mon);
    }

    #[test]
    fn snapshot_is_keyed_by_student_id() {
        let record = StudentRecord {
            name: "Alice".to_owned(),
            student_id: "42".into(),
            student_url: "https://example.test/students/42/activity".to_owned(),
            dashboard_info: DashboardInfo::default(),
            detailed_info: DetailedInfo::default(),
        };
        let records = [record];
        let value = Snapshot::new("https://example.test/students".to_owned(), &records)
            .to_value()
            .unwrap();
        assert_eq!(value["students"]["42"]["name"], "Alice");
        assert!(value["timestamp"].is_string());
        assert!(value["students"]["42"]["detailed_info"].get("activity_error").is_none());
    }
}
