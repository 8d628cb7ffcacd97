//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall).

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, rt_cpu: Option<usize>) {
    use libc::{
        CPU_SET, CPU_ZERO, MCL_CURRENT, SCHED_FIFO, mlockall, sched_get_priority_max,
        sched_get_priority_min, sched_param, sched_setaffinity, sched_setscheduler,
    };
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }

    RT_ONCE.get_or_init(|| {
        // Keep the loop's pages resident; a page fault at 1 kHz is a
        // missed deadline.
        let rc = unsafe { mlockall(MCL_CURRENT) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            tracing::warn!(%err, "mlockall failed; hint: raise 'ulimit -l' or grant CAP_IPC_LOCK");
        } else {
            tracing::info!("memory locked (current pages)");
        }

        // FIFO priority, clamped to the platform range.
        let (min, max) = unsafe {
            let min = sched_get_priority_min(SCHED_FIFO);
            let max = sched_get_priority_max(SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let prio_val = prio.unwrap_or(max).clamp(min, max);
        let param = sched_param {
            sched_priority: prio_val,
        };
        let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            tracing::warn!(%err, prio = prio_val, "SCHED_FIFO not applied; hint: needs CAP_SYS_NICE or root");
        } else {
            tracing::info!(prio = prio_val, "SCHED_FIFO applied");
        }

        // Pin to one CPU so the loop never migrates mid-tick.
        let target = rt_cpu.unwrap_or(0);
        let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        unsafe {
            CPU_ZERO(&mut set);
            CPU_SET(target, &mut set);
        }
        let rc = unsafe { sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            tracing::warn!(%err, cpu = target, "affinity not applied");
        } else {
            tracing::info!(cpu = target, "pinned to CPU");
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _rt_cpu: Option<usize>) {
    if rt {
        tracing::warn!("real-time mode is only supported on Linux; continuing without it");
    }
}
