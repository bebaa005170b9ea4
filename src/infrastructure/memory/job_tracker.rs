//! In-Memory Job Tracker Implementation

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{AssetKind, GenerationJob, JobError, JobState, JobTrackerPort};

/// 每个故事默认保留的已结束任务数
pub const DEFAULT_FINISHED_JOBS_PER_STORY: usize = 50;

/// 内存任务跟踪器
///
/// 进行中的任务一直保留；已结束的任务每个故事只保留最近 `finished_limit` 个
pub struct InMemoryJobTracker {
    /// job_id -> GenerationJob
    jobs: DashMap<Uuid, GenerationJob>,
    /// story_id -> Set<job_id>
    story_jobs: DashMap<Uuid, HashSet<Uuid>>,
    /// (story_id, chapter_number) -> 进行中的 job_id
    active_chapters: DashMap<(Uuid, i32), Uuid>,
    /// story_id -> 已结束的 job_id，按结束顺序
    finished: DashMap<Uuid, VecDeque<Uuid>>,
    finished_limit: usize,
}

impl InMemoryJobTracker {
    pub fn new() -> Self {
        Self::with_finished_limit(DEFAULT_FINISHED_JOBS_PER_STORY)
    }

    pub fn with_finished_limit(finished_limit: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            story_jobs: DashMap::new(),
            active_chapters: DashMap::new(),
            finished: DashMap::new(),
            finished_limit: finished_limit.max(1),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn finish(&self, job_id: Uuid, state: JobState, error: Option<(String, String)>) -> Result<(), JobError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        let old_state = job.state;
        job.state = state;
        job.completed_at = Some(Utc::now());
        if let Some((kind, message)) = error {
            job.error_kind = Some(kind);
            job.error_message = Some(message);
        }
        let story_id = job.story_id;
        let chapter_key = (story_id, job.chapter_number);
        drop(job);

        self.active_chapters.remove_if(&chapter_key, |_, active| *active == job_id);
        self.retire(story_id, job_id);

        tracing::debug!(
            job_id = %job_id,
            old_state = old_state.as_str(),
            new_state = state.as_str(),
            "Job finished"
        );
        Ok(())
    }

    /// 记录已结束的任务，超出上限时丢弃最早结束的
    fn retire(&self, story_id: Uuid, job_id: Uuid) {
        let evicted: Vec<Uuid> = {
            let mut finished = self.finished.entry(story_id).or_default();
            finished.push_back(job_id);
            let excess = finished.len().saturating_sub(self.finished_limit);
            finished.drain(..excess).collect()
        };

        if evicted.is_empty() {
            return;
        }
        if let Some(mut job_ids) = self.story_jobs.get_mut(&story_id) {
            for id in &evicted {
                job_ids.remove(id);
            }
        }
        for id in &evicted {
            self.jobs.remove(id);
        }
        tracing::debug!(story_id = %story_id, evicted = evicted.len(), "Old jobs evicted");
    }
}

impl Default for InMemoryJobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTrackerPort for InMemoryJobTracker {
    fn begin(&self, story_id: Uuid, chapter_number: i32, kind: AssetKind) -> Result<GenerationJob, JobError> {
        // entry 持有分片锁，检查和占用是原子的
        let job = match self.active_chapters.entry((story_id, chapter_number)) {
            Entry::Occupied(_) => {
                return Err(JobError::ChapterBusy {
                    story_id,
                    chapter_number,
                })
            }
            Entry::Vacant(slot) => {
                let job = GenerationJob::new(story_id, chapter_number, kind);
                slot.insert(job.job_id);
                job
            }
        };

        self.jobs.insert(job.job_id, job.clone());
        self.story_jobs.entry(story_id).or_default().insert(job.job_id);

        tracing::debug!(
            job_id = %job.job_id,
            story_id = %story_id,
            chapter_number = chapter_number,
            kind = %kind,
            "Job registered"
        );
        Ok(job)
    }

    fn mark_running(&self, job_id: Uuid) -> Result<(), JobError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;
        job.state = JobState::Running;
        Ok(())
    }

    fn mark_succeeded(&self, job_id: Uuid) -> Result<(), JobError> {
        self.finish(job_id, JobState::Succeeded, None)
    }

    fn mark_failed(&self, job_id: Uuid, kind: &str, message: String) -> Result<(), JobError> {
        self.finish(job_id, JobState::Failed, Some((kind.to_string(), message)))
    }

    fn get(&self, job_id: Uuid) -> Option<GenerationJob> {
        self.jobs.get(&job_id).map(|job| job.clone())
    }

    fn active_for_story(&self, story_id: Uuid) -> Vec<GenerationJob> {
        self.story_jobs
            .get(&story_id)
            .map(|job_ids| {
                job_ids
                    .iter()
                    .filter_map(|id| self.jobs.get(id).map(|job| job.clone()))
                    .filter(|job| job.state.is_active())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn forget_story(&self, story_id: Uuid) {
        if let Some((_, job_ids)) = self.story_jobs.remove(&story_id) {
            for job_id in &job_ids {
                self.jobs.remove(job_id);
            }
            tracing::debug!(story_id = %story_id, count = job_ids.len(), "Story jobs forgotten");
        }
        self.active_chapters.retain(|(sid, _), _| *sid != story_id);
        self.finished.remove(&story_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_active_job_per_chapter() {
        let tracker = InMemoryJobTracker::new();
        let story_id = Uuid::new_v4();

        let job = tracker.begin(story_id, 1, AssetKind::Image).unwrap();
        assert!(matches!(
            tracker.begin(story_id, 1, AssetKind::Audio),
            Err(JobError::ChapterBusy { chapter_number: 1, .. })
        ));
        // 其他章节不受影响
        tracker.begin(story_id, 2, AssetKind::Audio).unwrap();

        tracker.mark_running(job.job_id).unwrap();
        tracker.mark_succeeded(job.job_id).unwrap();
        tracker.begin(story_id, 1, AssetKind::Audio).unwrap();
    }

    #[test]
    fn test_failure_is_recorded() {
        let tracker = InMemoryJobTracker::new();
        let story_id = Uuid::new_v4();
        let job = tracker.begin(story_id, 3, AssetKind::Audio).unwrap();

        tracker
            .mark_failed(job.job_id, "upstream_refusal", "blocked".to_string())
            .unwrap();

        let stored = tracker.get(job.job_id).unwrap();
        assert_eq!(stored.state, JobState::Failed);
        assert_eq!(stored.error_kind.as_deref(), Some("upstream_refusal"));
        assert_eq!(stored.error_message.as_deref(), Some("blocked"));
        assert!(stored.completed_at.is_some());
        assert!(tracker.active_for_story(story_id).is_empty());
    }

    #[test]
    fn test_forget_story() {
        let tracker = InMemoryJobTracker::new();
        let story_id = Uuid::new_v4();
        let job = tracker.begin(story_id, 1, AssetKind::Image).unwrap();
        assert_eq!(tracker.active_for_story(story_id).len(), 1);

        tracker.forget_story(story_id);

        assert!(tracker.get(job.job_id).is_none());
        assert!(tracker.active_for_story(story_id).is_empty());
        assert!(matches!(tracker.mark_succeeded(job.job_id), Err(JobError::NotFound(_))));
        tracker.begin(story_id, 1, AssetKind::Image).unwrap();
    }

    #[test]
    fn test_finished_jobs_are_capped_per_story() {
        let tracker = InMemoryJobTracker::with_finished_limit(3);
        let story_id = Uuid::new_v4();
        let other_story = Uuid::new_v4();

        let running = tracker.begin(story_id, 2, AssetKind::Audio).unwrap();
        let other = tracker.begin(other_story, 1, AssetKind::Image).unwrap();
        tracker.mark_succeeded(other.job_id).unwrap();

        let mut finished = Vec::new();
        for _ in 0..5 {
            let job = tracker.begin(story_id, 1, AssetKind::Image).unwrap();
            tracker.mark_failed(job.job_id, "network_failure", "reset".to_string()).unwrap();
            finished.push(job.job_id);
        }

        // 最早结束的两个被丢弃
        assert!(tracker.get(finished[0]).is_none());
        assert!(tracker.get(finished[1]).is_none());
        for id in &finished[2..] {
            assert_eq!(tracker.get(*id).unwrap().state, JobState::Failed);
        }

        // 进行中的任务和其他故事不受影响
        assert_eq!(tracker.get(running.job_id).unwrap().state, JobState::Pending);
        assert_eq!(tracker.active_for_story(story_id).len(), 1);
        assert!(tracker.get(other.job_id).is_some());
        assert_eq!(tracker.story_jobs.get(&story_id).unwrap().len(), 4);
    }
}
