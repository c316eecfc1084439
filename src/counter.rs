// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 车辆计数 (VehicleCounter)

use std::collections::HashSet;

use crate::detection::Detection;

/// 统计标签属于车辆类别集合的检测数
pub fn count_vehicles(detections: &[Detection], vehicle_classes: &HashSet<String>) -> usize {
    detections
        .iter()
        .filter(|d| vehicle_classes.contains(&d.label))
        .count()
}

/// 车辆计数器, 持有车辆类别集合
#[derive(Debug, Clone)]
pub struct VehicleCounter {
    classes: HashSet<String>,
}

impl VehicleCounter {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn count(&self, detections: &[Detection]) -> usize {
        count_vehicles(detections, &self.classes)
    }

    /// 只保留车辆类别的检测 (渲染用)
    pub fn vehicles<'a>(&self, detections: &'a [Detection]) -> Vec<&'a Detection> {
        detections
            .iter()
            .filter(|d| self.classes.contains(&d.label))
            .collect()
    }

    pub fn is_vehicle(&self, label: &str) -> bool {
        self.classes.contains(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VEHICLE_CLASSES;
    use crate::detection::Bbox;

    fn det(label: &str) -> Detection {
        Detection::new(label, 0.9, Bbox::new(0., 0., 1., 1.))
    }

    #[test]
    fn test_counts_only_vehicle_classes() {
        let counter = VehicleCounter::new(DEFAULT_VEHICLE_CLASSES);
        let detections = vec![
            det("car"),
            det("person"),
            det("truck"),
            det("bus"),
            det("traffic light"),
            det("bicycle"),
            det("motorcycle"),
            det("car"),
        ];
        assert_eq!(counter.count(&detections), 6);
        assert_eq!(counter.vehicles(&detections).len(), 6);
    }

    #[test]
    fn test_empty_detections() {
        let counter = VehicleCounter::new(DEFAULT_VEHICLE_CLASSES);
        assert_eq!(counter.count(&[]), 0);
    }

    #[test]
    fn test_order_independent() {
        let counter = VehicleCounter::new(DEFAULT_VEHICLE_CLASSES);
        let mut detections = vec![det("dog"), det("car"), det("bus"), det("person")];
        let a = counter.count(&detections);
        detections.reverse();
        assert_eq!(counter.count(&detections), a);
    }

    #[test]
    fn test_custom_class_set() {
        let counter = VehicleCounter::new(["tram"]);
        assert_eq!(counter.count(&[det("tram"), det("car")]), 1);
        assert!(counter.is_vehicle("tram"));
        assert!(!counter.is_vehicle("car"));
    }

    #[test]
    fn test_free_function() {
        let classes: HashSet<String> = ["car".to_string()].into_iter().collect();
        assert_eq!(count_vehicles(&[det("car"), det("Car")], &classes), 1);
    }
}
